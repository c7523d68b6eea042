//! Telegram Bot API adapter.

pub mod client;
pub mod error;
pub mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{CallbackQuery, Chat, ChatType, Command, Message, Update, User};
