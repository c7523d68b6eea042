//! Dispatch integration tests.
//!
//! These tests drive a real [`Dispatcher`] against an in-memory messenger
//! with the Tokio clock paused, so pacing gaps are measured exactly.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beacon_common::Metrics;
use beacon_queue::{
    AnimationSource, AssetCache, Content, Delivery, Dispatcher, Lane, Messenger, MessengerError,
    Payload, SendTask, WorkerConfig,
};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Send { recipient: i64, body: String },
    SendCachedAnimation { recipient: i64, reference: String },
    Upload { recipient: i64 },
}

#[derive(Default)]
struct RecordingMessenger {
    calls: Mutex<Vec<(Call, Instant)>>,
    failing: HashSet<i64>,
    uploads: Mutex<u32>,
}

impl RecordingMessenger {
    fn failing(recipients: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: recipients.into_iter().collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    fn times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    fn recipients(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .map(|call| match call {
                Call::Send { recipient, .. }
                | Call::SendCachedAnimation { recipient, .. }
                | Call::Upload { recipient } => recipient,
            })
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, recipient: i64, payload: &Payload) -> Result<Delivery, MessengerError> {
        match &payload.content {
            Content::Animation {
                source: AnimationSource::Uploaded(reference),
                ..
            } => self.record(Call::SendCachedAnimation {
                recipient,
                reference: reference.clone(),
            }),
            _ => self.record(Call::Send {
                recipient,
                body: payload.body().to_string(),
            }),
        }

        if self.failing.contains(&recipient) {
            return Err(MessengerError::Unreachable("bot was blocked by the user".into()));
        }
        Ok(Delivery {
            message_id: Some(recipient),
            asset_reference: None,
        })
    }

    async fn upload_and_send(
        &self,
        recipient: i64,
        _asset: &Path,
        _payload: &Payload,
    ) -> Result<Delivery, MessengerError> {
        self.record(Call::Upload { recipient });
        let mut uploads = self.uploads.lock().unwrap();
        *uploads += 1;
        Ok(Delivery {
            message_id: Some(recipient),
            asset_reference: Some(format!("file-{uploads}")),
        })
    }
}

struct Harness {
    dispatcher: Dispatcher,
    messenger: Arc<RecordingMessenger>,
    metrics: Arc<Metrics>,
    asset: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness(messenger: RecordingMessenger) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("welcome.mp4");
    let assets = AssetCache::open(&asset, dir.path().join("file_id_cache.json")).await;
    let messenger = Arc::new(messenger);
    let metrics = Arc::new(Metrics::new());
    let dispatcher = Dispatcher::with_metrics(
        Arc::clone(&messenger) as Arc<dyn Messenger>,
        Arc::new(assets),
        WorkerConfig::default(),
        Arc::clone(&metrics),
    );
    Harness {
        dispatcher,
        messenger,
        metrics,
        asset,
        _dir: dir,
    }
}

#[tokio::test(start_paused = true)]
async fn test_interactive_lane_drains_before_bulk() {
    let h = harness(RecordingMessenger::default()).await;

    h.dispatcher.enqueue_bulk(100, Payload::text("X"));
    h.dispatcher.enqueue_bulk(101, Payload::text("Y"));
    h.dispatcher.enqueue_interactive(1, Payload::text("A"));
    h.dispatcher.enqueue_interactive(2, Payload::text("B"));
    h.dispatcher.enqueue_interactive(3, Payload::text("C"));
    assert!(h.dispatcher.ensure_worker_running());
    h.dispatcher.wait_idle().await;

    assert_eq!(h.messenger.recipients(), vec![1, 2, 3, 100, 101]);

    let times = h.messenger.times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(34));
    }
    assert!(!h.dispatcher.is_worker_active());
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_does_not_stop_the_worker() {
    let h = harness(RecordingMessenger::failing([100])).await;

    h.dispatcher.enqueue_bulk(100, Payload::text("X"));
    h.dispatcher.enqueue_bulk(101, Payload::text("Y"));
    h.dispatcher.ensure_worker_running();
    h.dispatcher.wait_idle().await;

    assert_eq!(h.messenger.recipients(), vec![100, 101]);
    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.deliveries_failed, 1);
    assert_eq!(snapshot.deliveries_succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_interactive_preempts_running_broadcast() {
    let h = harness(RecordingMessenger::default()).await;

    h.dispatcher.enqueue_batch([
        SendTask::broadcast(100, Payload::text("X")),
        SendTask::broadcast(101, Payload::text("Y")),
        SendTask::broadcast(102, Payload::text("Z")),
    ]);
    assert!(h.dispatcher.ensure_worker_running());

    // X goes out at t=0 and Y at t=34ms; A arrives before the next pop.
    tokio::time::sleep(Duration::from_millis(40)).await;
    h.dispatcher.enqueue_interactive(1, Payload::text("A"));
    assert!(!h.dispatcher.ensure_worker_running());

    h.dispatcher.wait_idle().await;

    assert_eq!(h.messenger.recipients(), vec![100, 101, 1, 102]);
    assert_eq!(h.metrics.snapshot().workers_spawned, 1);
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_after_drain_restarts_worker() {
    let h = harness(RecordingMessenger::default()).await;

    h.dispatcher.enqueue_interactive(1, Payload::text("first"));
    h.dispatcher.ensure_worker_running();
    h.dispatcher.wait_idle().await;
    assert!(!h.dispatcher.is_worker_active());

    h.dispatcher.enqueue_interactive(2, Payload::text("second"));
    assert!(h.dispatcher.ensure_worker_running());
    h.dispatcher.wait_idle().await;

    assert_eq!(
        h.messenger.calls(),
        vec![
            Call::Send {
                recipient: 1,
                body: "first".into()
            },
            Call::Send {
                recipient: 2,
                body: "second".into()
            },
        ]
    );
    assert!(!h.dispatcher.has_pending(Lane::Interactive));
}

#[tokio::test(start_paused = true)]
async fn test_welcome_animation_uploaded_once() {
    let h = harness(RecordingMessenger::default()).await;
    let welcome = Payload::animation(AnimationSource::LocalAsset(h.asset.clone()), "Welcome");

    h.dispatcher.enqueue_interactive(1, welcome.clone());
    h.dispatcher.enqueue_interactive(2, welcome);
    h.dispatcher.ensure_worker_running();
    h.dispatcher.wait_idle().await;

    assert_eq!(
        h.messenger.calls(),
        vec![
            Call::Upload { recipient: 1 },
            Call::SendCachedAnimation {
                recipient: 2,
                reference: "file-1".into()
            },
        ]
    );
    assert_eq!(h.dispatcher.cached_asset_reference().as_deref(), Some("file-1"));

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.asset_uploads, 1);
    assert_eq!(snapshot.asset_cache_hits, 1);
}
