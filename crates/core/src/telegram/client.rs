//! Bot API HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use beacon_common::BotConfig;
use beacon_queue::{
    AnimationSource, Content, Delivery, InlineKeyboard, Messenger, MessengerError, ParseMode,
    Payload,
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::TelegramError;
use super::types::{ApiResponse, Message, Update, User};

/// Timeout for ordinary Bot API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra slack on top of the long-poll timeout for `getUpdates`.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: ParseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Serialize)]
struct SendPhotoRequest<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
    parse_mode: ParseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Serialize)]
struct SendAnimationRequest<'a> {
    chat_id: i64,
    animation: &'a str,
    caption: &'a str,
    parse_mode: ParseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_token: Option<&'a str>,
    allowed_updates: &'static [&'static str],
}

#[derive(Serialize)]
struct DeleteWebhookRequest {
    drop_pending_updates: bool,
}

/// Update kinds the bot subscribes to.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Client for `https://api.telegram.org/bot<token>/<method>`.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The base URL embeds the token.
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a client for `token` against `api_base`.
    pub fn new(api_base: &str, token: &str) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
        })
    }

    /// Create a client from the bot configuration.
    pub fn from_config(config: &BotConfig) -> Result<Self, TelegramError> {
        Self::new(&config.api_base, &config.token)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with_timeout(method, body, REQUEST_TIMEOUT).await
    }

    async fn call_with_timeout<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, TelegramError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        decode(method, response).await
    }

    /// `sendMessage`.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
        parse_mode: ParseMode,
    ) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup: keyboard,
        };
        self.call("sendMessage", &request).await
    }

    /// `sendPhoto` with a file id already known to the Bot API.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
        parse_mode: ParseMode,
    ) -> Result<Message, TelegramError> {
        let request = SendPhotoRequest {
            chat_id,
            photo: file_id,
            caption,
            parse_mode,
            reply_markup: keyboard,
        };
        self.call("sendPhoto", &request).await
    }

    /// `sendAnimation` with a file id already known to the Bot API.
    pub async fn send_animation(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
        parse_mode: ParseMode,
    ) -> Result<Message, TelegramError> {
        let request = SendAnimationRequest {
            chat_id,
            animation: file_id,
            caption,
            parse_mode,
            reply_markup: keyboard,
        };
        self.call("sendAnimation", &request).await
    }

    /// `sendAnimation` uploading a local file as multipart form data.
    pub async fn upload_animation(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
        parse_mode: ParseMode,
    ) -> Result<Message, TelegramError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TelegramError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "animation".to_string(), |n| n.to_string_lossy().into_owned());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", parse_mode.as_str())
            .part("animation", Part::bytes(bytes).file_name(file_name));
        if let Some(keyboard) = keyboard {
            let markup = serde_json::to_string(keyboard)
                .map_err(|e| TelegramError::Malformed(e.to_string()))?;
            form = form.text("reply_markup", markup);
        }

        debug!(chat_id, asset = %path.display(), "Uploading animation");
        let response = self
            .http
            .post(self.endpoint("sendAnimation"))
            .timeout(REQUEST_TIMEOUT * 4)
            .multipart(form)
            .send()
            .await?;
        decode("sendAnimation", response).await
    }

    /// `answerCallbackQuery`.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<bool, TelegramError> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id,
            text,
        };
        self.call("answerCallbackQuery", &request).await
    }

    /// `getMe`.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// `getUpdates` long poll.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call_with_timeout(
            "getUpdates",
            &request,
            Duration::from_secs(timeout_secs) + POLL_GRACE,
        )
        .await
    }

    /// `setWebhook`.
    pub async fn set_webhook(
        &self,
        url: &str,
        secret_token: Option<&str>,
    ) -> Result<bool, TelegramError> {
        let request = SetWebhookRequest {
            url,
            secret_token,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("setWebhook", &request).await
    }

    /// `deleteWebhook`.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, TelegramError> {
        let request = DeleteWebhookRequest {
            drop_pending_updates,
        };
        self.call("deleteWebhook", &request).await
    }
}

async fn decode<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, TelegramError> {
    let status = response.status();
    let body = response.bytes().await?;

    let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
        TelegramError::Malformed(format!("{method} returned HTTP {status}: {e}"))
    })?;

    if !envelope.ok {
        return Err(TelegramError::Api {
            code: envelope
                .error_code
                .unwrap_or_else(|| i64::from(status.as_u16())),
            description: envelope.description.unwrap_or_default(),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        });
    }

    envelope
        .result
        .ok_or_else(|| TelegramError::Malformed(format!("{method} returned no result")))
}

fn delivered(message: &Message) -> Delivery {
    Delivery {
        message_id: Some(message.message_id),
        asset_reference: None,
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, recipient: i64, payload: &Payload) -> Result<Delivery, MessengerError> {
        let keyboard = payload.keyboard.as_ref();
        let message = match &payload.content {
            Content::Text(text) => {
                self.send_message(recipient, text, keyboard, payload.parse_mode)
                    .await?
            }
            Content::Photo { file_id, caption } => {
                self.send_photo(recipient, file_id, caption, keyboard, payload.parse_mode)
                    .await?
            }
            Content::Animation {
                source: AnimationSource::Uploaded(file_id),
                caption,
            } => {
                self.send_animation(recipient, file_id, caption, keyboard, payload.parse_mode)
                    .await?
            }
            Content::Animation {
                source: AnimationSource::LocalAsset(path),
                ..
            } => return self.upload_and_send(recipient, path, payload).await,
        };
        Ok(delivered(&message))
    }

    async fn upload_and_send(
        &self,
        recipient: i64,
        asset: &Path,
        payload: &Payload,
    ) -> Result<Delivery, MessengerError> {
        let message = self
            .upload_animation(
                recipient,
                asset,
                payload.body(),
                payload.keyboard.as_ref(),
                payload.parse_mode,
            )
            .await?;
        Ok(Delivery {
            asset_reference: message.animation_file_id(),
            ..delivered(&message)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use beacon_queue::UrlButton;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::new(&server.base_url(), "test-token").unwrap()
    }

    fn sent_message(message_id: i64) -> serde_json::Value {
        json!({
            "ok": true,
            "result": {
                "message_id": message_id,
                "chat": {"id": 42, "type": "private"},
                "date": 1_700_000_000
            }
        })
    }

    #[tokio::test]
    async fn test_send_text_with_keyboard() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/sendMessage")
                .json_body(json!({
                    "chat_id": 42,
                    "text": "hello",
                    "parse_mode": "HTML",
                    "reply_markup": {
                        "inline_keyboard": [[{"text": "Open", "url": "https://example.com"}]]
                    }
                }));
            then.status(200).json_body(sent_message(55));
        });

        let payload = Payload::text("hello")
            .with_keyboard(InlineKeyboard::new().button(UrlButton::new("Open", "https://example.com")));
        let delivery = client(&server).send(42, &payload).await.unwrap();

        sent.assert_calls(1);
        assert_eq!(delivery.message_id, Some(55));
        assert_eq!(delivery.asset_reference, None);
    }

    #[tokio::test]
    async fn test_photo_reuses_file_id() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/sendPhoto")
                .json_body_includes(r#"{"photo": "AgACAgQ", "caption": "News"}"#);
            then.status(200).json_body(sent_message(56));
        });

        client(&server)
            .send(42, &Payload::photo("AgACAgQ", "News"))
            .await
            .unwrap();
        sent.assert_calls(1);
    }

    #[tokio::test]
    async fn test_upload_returns_asset_reference() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/sendAnimation")
                .body_includes("name=\"animation\"; filename=\"welcome.mp4\"");
            then.status(200).json_body(json!({
                "ok": true,
                "result": {
                    "message_id": 57,
                    "chat": {"id": 42, "type": "private"},
                    "date": 1_700_000_000,
                    "animation": {"file_id": "CgACAgQ", "file_unique_id": "u1"},
                    "document": {"file_id": "CgACAgQ", "file_unique_id": "u1"}
                }
            }));
        });

        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("welcome.mp4");
        tokio::fs::write(&asset, b"not really an mp4").await.unwrap();

        let payload = Payload::animation(AnimationSource::LocalAsset(asset.clone()), "Welcome");
        let delivery = client(&server)
            .upload_and_send(42, &asset, &payload)
            .await
            .unwrap();

        upload.assert_calls(1);
        assert_eq!(delivery.asset_reference.as_deref(), Some("CgACAgQ"));
    }

    #[tokio::test]
    async fn test_missing_asset_is_asset_error() {
        let server = MockServer::start();
        let payload = Payload::animation(AnimationSource::LocalAsset("/nonexistent.mp4".into()), "");

        let err = client(&server)
            .send(42, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::Asset(_)));
    }

    #[tokio::test]
    async fn test_blocked_user_maps_to_unreachable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/sendMessage");
            then.status(403).json_body(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            }));
        });

        let err = client(&server)
            .send(42, &Payload::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_flood_control_carries_retry_after() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/sendMessage");
            then.status(429).json_body(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5",
                "parameters": {"retry_after": 5}
            }));
        });

        let err = client(&server)
            .send_message(42, "hi", None, ParseMode::Html)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TelegramError::Api {
                code: 429,
                retry_after: Some(5),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_json_response_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/getMe");
            then.status(502).body("Bad Gateway");
        });

        let err = client(&server).get_me().await.unwrap_err();
        assert!(matches!(err, TelegramError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_get_updates_passes_offset() {
        let server = MockServer::start();
        let poll = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/getUpdates")
                .json_body_includes(r#"{"offset": 11, "timeout": 0}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": [{
                    "update_id": 11,
                    "callback_query": {
                        "id": "cb1",
                        "from": {"id": 5, "is_bot": false, "first_name": "Ann"},
                        "data": "main"
                    }
                }]
            }));
        });

        let updates = client(&server).get_updates(Some(11), 0).await.unwrap();

        poll.assert_calls(1);
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].callback_query.as_ref().unwrap().data.as_deref(),
            Some("main")
        );
    }

    #[tokio::test]
    async fn test_set_webhook_sends_secret() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/setWebhook")
                .json_body_includes(
                    r#"{"url": "https://bot.example.com/telegram/webhook", "secret_token": "s3cret"}"#,
                );
            then.status(200).json_body(json!({"ok": true, "result": true}));
        });

        let ok = client(&server)
            .set_webhook("https://bot.example.com/telegram/webhook", Some("s3cret"))
            .await
            .unwrap();

        hook.assert_calls(1);
        assert!(ok);
    }
}
