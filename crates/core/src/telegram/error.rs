//! Bot API client errors.

use std::path::PathBuf;

use beacon_common::AppError;
use beacon_queue::MessengerError;
use thiserror::Error;

/// Error returned by [`super::TelegramClient`].
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// `error_code` of the envelope (HTTP status when absent).
        code: i64,
        /// Human readable description.
        description: String,
        /// Seconds to wait before retrying, for flood-control errors.
        retry_after: Option<u64>,
    },

    /// The response did not match the Bot API envelope.
    #[error("Malformed Bot API response: {0}")]
    Malformed(String),

    /// A local file could not be read for upload.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl From<TelegramError> for MessengerError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Api {
                retry_after: Some(retry_after),
                ..
            } => Self::RateLimited { retry_after },
            TelegramError::Api { code: 429, .. } => Self::RateLimited { retry_after: 0 },
            TelegramError::Api {
                code: 403,
                description,
                ..
            } => Self::Unreachable(description),
            TelegramError::Api { code, description, .. } => {
                Self::Rejected(format!("{code}: {description}"))
            }
            TelegramError::Http(e) => Self::Transport(e.to_string()),
            TelegramError::Malformed(msg) => Self::Transport(msg),
            e @ TelegramError::Io { .. } => Self::Asset(e.to_string()),
        }
    }
}

impl From<TelegramError> for AppError {
    fn from(err: TelegramError) -> Self {
        Self::Messenger(err.to_string())
    }
}
