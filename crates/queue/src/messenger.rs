//! Messenger capability used by the dispatch worker.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::payload::Payload;

/// Result of a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Id of the sent message, when the transport reports one.
    pub message_id: Option<i64>,
    /// Reference for an uploaded asset, reusable for later sends.
    pub asset_reference: Option<String>,
}

/// Delivery failure.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// The recipient blocked the bot or no longer exists.
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    /// The transport asked us to slow down.
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited {
        /// Seconds requested by the transport.
        retry_after: u64,
    },

    /// The request was rejected (bad payload, bad markup, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local asset could not be read.
    #[error("asset error: {0}")]
    Asset(String),
}

/// Sends payloads to one recipient at a time.
///
/// Implementations must report failures through the returned error and
/// never panic on transport problems.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a payload.
    async fn send(&self, recipient: i64, payload: &Payload) -> Result<Delivery, MessengerError>;

    /// Upload a local asset as the payload's animation and send it.
    ///
    /// The returned [`Delivery::asset_reference`] identifies the upload.
    async fn upload_and_send(
        &self,
        recipient: i64,
        asset: &Path,
        payload: &Payload,
    ) -> Result<Delivery, MessengerError>;
}
