//! Update handlers.
//!
//! [`BotService`] turns incoming updates into directory calls and dispatch
//! tasks. Everything the bot says to users goes through the dispatcher,
//! except operator denials and acknowledgements, which are sent directly.

mod broadcast;
mod directory;
mod messages;
mod service;
mod throttle;

pub use broadcast::BroadcastRequest;
pub use directory::Directory;
pub use messages::{group_welcome, main_keyboard, open_app_url};
pub use service::{BotApi, BotService, BotSettings};
pub use throttle::WelcomeThrottle;
