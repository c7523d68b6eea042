//! `/broadcast` argument parsing.

use beacon_queue::{InlineKeyboard, Payload, UrlButton};

use super::messages::OPEN_APP_LABEL;

/// Separator between the text and each button definition.
const PART_SEPARATOR: &str = "||";

/// A parsed operator broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    /// Message text, or photo caption.
    pub text: String,
    /// Photo to reuse, by Bot API file id.
    pub photo: Option<String>,
    /// Buttons, always ending with the "Open App" row.
    pub keyboard: InlineKeyboard,
}

impl BroadcastRequest {
    /// Parse `text||Label,https://url||...`.
    ///
    /// Button parts without a comma, or with an empty label or URL, are
    /// skipped. Returns `None` when there is neither text nor photo.
    #[must_use]
    pub fn parse(args: &str, photo: Option<&str>, open_app_url: &str) -> Option<Self> {
        let mut parts = args.split(PART_SEPARATOR);
        let text = parts.next().unwrap_or_default().trim();
        if text.is_empty() && photo.is_none() {
            return None;
        }

        let mut keyboard = InlineKeyboard::new();
        for part in parts {
            let Some((label, url)) = part.trim().split_once(',') else {
                continue;
            };
            let (label, url) = (label.trim(), url.trim());
            if !label.is_empty() && !url.is_empty() {
                keyboard.push_button(UrlButton::new(label, url));
            }
        }
        keyboard.push_button(UrlButton::new(OPEN_APP_LABEL, open_app_url));

        Some(Self {
            text: text.to_string(),
            photo: photo.map(str::to_string),
            keyboard,
        })
    }

    /// Payload sent to every recipient.
    #[must_use]
    pub fn payload(&self) -> Payload {
        match &self.photo {
            Some(file_id) => Payload::photo(file_id, &self.text),
            None => Payload::text(&self.text),
        }
        .with_keyboard(self.keyboard.clone())
    }
}
