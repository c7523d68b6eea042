//! User-facing texts and keyboards.

use beacon_queue::{InlineKeyboard, UrlButton};

use super::service::BotSettings;
use crate::telegram::User;

pub(crate) const OPEN_APP_LABEL: &str = "🚀 Open App";

pub(crate) const WELCOME_CAPTION: &str = "CoinBeats Crypto School is an interactive platform for crypto education where you can get paid to learn about DeFi protocols, \
NFTs, gaming, trading, earning yield, and discovering alpha from the best educators in the space. 🤓📕\n\n\
All lessons come with quizzes, raffles, and tasks. By completing academies, you'll qualify for raffles and participate in Weekly Scholarship \
(minimum $100 per student) competitions, as well as earn points for potential future airdrop. 💰💰\n\n\
Start learning and earning daily rewards! 🚀🚀";

pub(crate) const NOT_AUTHORIZED: &str = "You are not authorized to use this command.";

pub(crate) const BROADCAST_USAGE: &str = "Please provide a message or image to broadcast.";

pub(crate) fn broadcast_queued(recipients: usize) -> String {
    format!("Broadcast queued for {recipients} recipients.")
}

pub(crate) fn start_in_private(bot_username: &str) -> String {
    format!("Please start me in private by clicking here: https://t.me/{bot_username}")
}

/// Welcome text for a member who joined a group.
#[must_use]
pub fn group_welcome(member: &User, bot_username: &str) -> String {
    format!(
        "Welcome, {}! 🎉\n\n\
CoinBeats Crypto School is an interactive platform for crypto education where you can get paid to learn about DeFi protocols, NFTs, gaming, trading, \
earning yield, and discovering alpha from the best educators in the space. 🤓📕\n\n\
👉 <b>To get started, please start our bot in private:</b> @{bot_username}\n\n\
🚀 Start learning and earning daily rewards!",
        member.mention_html()
    )
}

/// Mini app URL, carrying the start parameter when there is one.
#[must_use]
pub fn open_app_url(base: &str, start_param: &str) -> String {
    if start_param.is_empty() {
        base.to_string()
    } else {
        format!("{base}?startapp={start_param}")
    }
}

/// Keyboard attached to the private welcome.
#[must_use]
pub fn main_keyboard(settings: &BotSettings, start_param: &str) -> InlineKeyboard {
    InlineKeyboard::new()
        .button(UrlButton::new(
            OPEN_APP_LABEL,
            open_app_url(&settings.mini_app_url, start_param),
        ))
        .button(UrlButton::new("📢 Subscribe To Channel", &settings.channel_url))
        .button(UrlButton::new("💬 Discussion Groups", &settings.discussion_url))
        .button(UrlButton::new("🤝 Partnerships for Protocols", &settings.support_url))
        .button(UrlButton::new("🆘 Help & Support", &settings.support_url))
}

pub(crate) fn group_keyboard(settings: &BotSettings) -> InlineKeyboard {
    InlineKeyboard::new().button(UrlButton::new("🚀 Start Bot in Private", &settings.bot_link))
}
