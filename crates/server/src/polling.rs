//! Long-polling transport.

use std::time::Duration;

use beacon_core::{BotService, TelegramClient, TelegramError};
use tracing::{debug, error, warn};

/// Wait after a failed `getUpdates` call.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Poll forever, handing each update to its own task.
pub async fn run(client: &TelegramClient, service: &BotService, timeout_secs: u64) {
    if let Err(e) = client.delete_webhook(false).await {
        warn!(error = %e, "Failed to delete webhook before polling");
    }

    let mut offset = None;
    loop {
        match poll_once(client, service, offset, timeout_secs).await {
            Ok(next) => offset = next,
            Err(e) => {
                error!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
}

/// One `getUpdates` round. Returns the offset for the next round.
pub async fn poll_once(
    client: &TelegramClient,
    service: &BotService,
    offset: Option<i64>,
    timeout_secs: u64,
) -> Result<Option<i64>, TelegramError> {
    let updates = client.get_updates(offset, timeout_secs).await?;
    let mut next = offset;

    for update in updates {
        next = Some(next.map_or(update.update_id + 1, |n| n.max(update.update_id + 1)));
        debug!(update_id = update.update_id, "Received update");

        let service = service.clone();
        tokio::spawn(async move {
            service.handle_update(update).await;
        });
    }
    Ok(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::bot_service;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_offset_advances_past_last_update() {
        let server = MockServer::start();
        let poll = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/getUpdates")
                .json_body_includes(r#"{"offset": 7}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": [{"update_id": 7}, {"update_id": 9}]
            }));
        });
        let client = TelegramClient::new(&server.base_url(), "test-token").unwrap();
        let (service, _dir) = bot_service().await;

        let next = poll_once(&client, &service, Some(7), 0).await.unwrap();

        poll.assert_calls(1);
        assert_eq!(next, Some(10));
    }

    #[tokio::test]
    async fn test_empty_round_keeps_offset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/getUpdates");
            then.status(200).json_body(json!({"ok": true, "result": []}));
        });
        let client = TelegramClient::new(&server.base_url(), "test-token").unwrap();
        let (service, _dir) = bot_service().await;

        assert_eq!(poll_once(&client, &service, None, 0).await.unwrap(), None);
        assert_eq!(poll_once(&client, &service, Some(3), 0).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_api_error_is_returned() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/getUpdates");
            then.status(409).json_body(json!({
                "ok": false,
                "error_code": 409,
                "description": "Conflict: can't use getUpdates method while webhook is active"
            }));
        });
        let client = TelegramClient::new(&server.base_url(), "test-token").unwrap();
        let (service, _dir) = bot_service().await;

        let err = poll_once(&client, &service, None, 0).await.unwrap_err();
        assert!(matches!(err, TelegramError::Api { code: 409, .. }));
    }
}
