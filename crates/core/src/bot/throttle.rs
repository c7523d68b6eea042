//! Group welcome throttle.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Allows one group welcome per window, process wide.
#[derive(Debug)]
pub struct WelcomeThrottle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl WelcomeThrottle {
    /// Default window between two welcomes.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Claim the slot. Returns false while the previous welcome is too recent.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_some_and(|prev| now.duration_since(prev) < self.window) {
            return false;
        }
        *last = Some(now);
        true
    }
}

impl Default for WelcomeThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_one_welcome_per_window() {
        let throttle = WelcomeThrottle::default();

        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!throttle.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(throttle.try_acquire());
    }
}
