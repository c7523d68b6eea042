//! Send task queued on a dispatch lane.

use std::fmt;

use crate::payload::Payload;

/// Dispatch lane. The interactive lane always drains first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Replies to a user's own action.
    Interactive,
    /// Operator broadcasts.
    Bulk,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => f.write_str("interactive"),
            Self::Bulk => f.write_str("bulk"),
        }
    }
}

/// One deferred send. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTask {
    /// Reply triggered directly by the recipient.
    Direct {
        /// Telegram chat id.
        recipient: i64,
        /// Message to send.
        payload: Payload,
    },
    /// One recipient's copy of an operator broadcast.
    Broadcast {
        /// Telegram chat id.
        recipient: i64,
        /// Message to send.
        payload: Payload,
    },
}

impl SendTask {
    /// Direct task for the interactive lane.
    #[must_use]
    pub const fn direct(recipient: i64, payload: Payload) -> Self {
        Self::Direct { recipient, payload }
    }

    /// Broadcast task for the bulk lane.
    #[must_use]
    pub const fn broadcast(recipient: i64, payload: Payload) -> Self {
        Self::Broadcast { recipient, payload }
    }

    /// Lane this task belongs to.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        match self {
            Self::Direct { .. } => Lane::Interactive,
            Self::Broadcast { .. } => Lane::Bulk,
        }
    }

    /// Target chat id.
    #[must_use]
    pub const fn recipient(&self) -> i64 {
        match self {
            Self::Direct { recipient, .. } | Self::Broadcast { recipient, .. } => *recipient,
        }
    }

    /// Message to send.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        match self {
            Self::Direct { payload, .. } | Self::Broadcast { payload, .. } => payload,
        }
    }
}
