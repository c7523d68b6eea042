//! Bot logic for beacon.
//!
//! - **telegram**: Bot API models and the HTTP client implementing the
//!   dispatch messenger
//! - **bot**: command, callback and group-join handlers

pub mod bot;
pub mod telegram;

pub use bot::{BotApi, BotService, BotSettings, Directory};
pub use telegram::{TelegramClient, TelegramError};
