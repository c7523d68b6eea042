//! Outbound message payloads.

use std::path::PathBuf;

use serde::Serialize;

/// Text formatting mode understood by the Bot API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    /// HTML subset (`<b>`, `<a href>`, ...).
    #[default]
    #[serde(rename = "HTML")]
    Html,
    /// `MarkdownV2`.
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
}

impl ParseMode {
    /// Wire name used by the Bot API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Single URL button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlButton {
    /// Button label.
    pub text: String,
    /// URL opened on tap.
    pub url: String,
}

impl UrlButton {
    /// Create a button.
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Inline keyboard, serialized as `{"inline_keyboard": [[...], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    #[serde(rename = "inline_keyboard")]
    rows: Vec<Vec<UrlButton>>,
}

impl InlineKeyboard {
    /// Empty keyboard.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a row holding a single button.
    #[must_use]
    pub fn button(mut self, button: UrlButton) -> Self {
        self.rows.push(vec![button]);
        self
    }

    /// Append a row holding a single button, in place.
    pub fn push_button(&mut self, button: UrlButton) {
        self.rows.push(vec![button]);
    }

    /// Keyboard rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<UrlButton>] {
        &self.rows
    }

    /// Whether the keyboard has no buttons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// Where an animation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationSource {
    /// A reference issued by the Bot API for an earlier upload.
    Uploaded(String),
    /// A local file. The worker swaps in the cached reference when one exists.
    LocalAsset(PathBuf),
}

/// Message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text message.
    Text(String),
    /// Photo already known to the Bot API, with a caption.
    Photo {
        /// Bot API file id.
        file_id: String,
        /// Caption text.
        caption: String,
    },
    /// Animation (GIF/MP4) with a caption.
    Animation {
        /// Animation source.
        source: AnimationSource,
        /// Caption text.
        caption: String,
    },
}

/// A complete outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Message body.
    pub content: Content,
    /// Optional inline keyboard.
    pub keyboard: Option<InlineKeyboard>,
    /// Formatting mode.
    pub parse_mode: ParseMode,
}

impl Payload {
    fn with_content(content: Content) -> Self {
        Self {
            content,
            keyboard: None,
            parse_mode: ParseMode::Html,
        }
    }

    /// Text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_content(Content::Text(text.into()))
    }

    /// Photo message.
    pub fn photo(file_id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::with_content(Content::Photo {
            file_id: file_id.into(),
            caption: caption.into(),
        })
    }

    /// Animation message.
    pub fn animation(source: AnimationSource, caption: impl Into<String>) -> Self {
        Self::with_content(Content::Animation {
            source,
            caption: caption.into(),
        })
    }

    /// Attach a keyboard. Empty keyboards are dropped.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = (!keyboard.is_empty()).then_some(keyboard);
        self
    }

    /// Same payload with another animation source.
    #[must_use]
    pub fn with_animation_source(&self, source: AnimationSource) -> Self {
        let mut payload = self.clone();
        if let Content::Animation { source: current, .. } = &mut payload.content {
            *current = source;
        }
        payload
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self.content {
            Content::Text(_) => "text",
            Content::Photo { .. } => "photo",
            Content::Animation { .. } => "animation",
        }
    }

    /// Text or caption of the message.
    #[must_use]
    pub fn body(&self) -> &str {
        match &self.content {
            Content::Text(text) => text,
            Content::Photo { caption, .. } | Content::Animation { caption, .. } => caption,
        }
    }
}
