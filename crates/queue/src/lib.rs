//! Outbound message dispatch for beacon.
//!
//! Every message the bot sends goes through this crate:
//!
//! - **Lanes**: interactive replies always run before queued broadcast copies
//! - **Dispatcher**: single paced worker, started on demand
//! - **Asset cache**: the welcome animation is uploaded once and reused
//! - **Messenger**: the transport seam implemented by the Bot API client

pub mod asset_cache;
pub mod dispatcher;
pub mod jobs;
pub mod lanes;
pub mod messenger;
pub mod payload;
pub mod workers;

pub use asset_cache::AssetCache;
pub use dispatcher::Dispatcher;
pub use jobs::*;
pub use lanes::DispatchQueue;
pub use messenger::{Delivery, Messenger, MessengerError};
pub use payload::{AnimationSource, Content, InlineKeyboard, ParseMode, Payload, UrlButton};
pub use workers::*;
