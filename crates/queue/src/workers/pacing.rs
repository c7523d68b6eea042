//! Pacing worker.
//!
//! Drains both lanes one task at a time and sleeps a fixed floor after
//! every send, keeping the outbound rate under the Bot API flood limit
//! (about 30 messages per second).

use std::time::Duration;

use beacon_common::{DispatchConfig, Metrics};
use tracing::{debug, error, info, warn};

use crate::asset_cache::AssetCache;
use crate::dispatcher::Shared;
use crate::jobs::SendTask;
use crate::messenger::{Delivery, Messenger, MessengerError};
use crate::payload::{AnimationSource, Content};

/// Worker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Minimum wall-clock time between two sends.
    pub pacing_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pacing_interval: Duration::from_millis(34),
        }
    }
}

impl From<&DispatchConfig> for WorkerConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            pacing_interval: config.pacing_interval(),
        }
    }
}

/// Run one task against the messenger.
///
/// Animations pointing at the cached local asset reuse the stored reference;
/// without one the asset is uploaded and the returned reference saved.
pub async fn execute_task(
    task: &SendTask,
    messenger: &dyn Messenger,
    assets: &AssetCache,
    metrics: &Metrics,
) -> Result<Delivery, MessengerError> {
    let recipient = task.recipient();
    let payload = task.payload();

    let Content::Animation {
        source: AnimationSource::LocalAsset(path),
        ..
    } = &payload.content
    else {
        return messenger.send(recipient, payload).await;
    };

    if path.as_path() == assets.asset() {
        if let Some(reference) = assets.reference() {
            metrics.record_asset_access(true);
            let resolved = payload.with_animation_source(AnimationSource::Uploaded(reference));
            return messenger.send(recipient, &resolved).await;
        }
    }

    metrics.record_asset_access(false);
    let delivery = messenger.upload_and_send(recipient, path, payload).await?;

    if path.as_path() == assets.asset() {
        match &delivery.asset_reference {
            Some(reference) => {
                if let Err(e) = assets.save(reference).await {
                    warn!(error = %e, "Failed to persist asset reference");
                }
            }
            None => warn!(asset = %path.display(), "Upload returned no asset reference"),
        }
    }

    Ok(delivery)
}

/// Drain loop. Exits once both lanes are observed empty.
pub(crate) async fn run(shared: std::sync::Arc<Shared>) {
    let mut delivered = 0u64;
    let mut failed = 0u64;
    info!("Dispatch worker started");

    while let Some(task) = shared.next_task() {
        let lane = task.lane();
        let recipient = task.recipient();

        match execute_task(&task, shared.messenger(), shared.assets(), shared.metrics()).await {
            Ok(delivery) => {
                delivered += 1;
                shared.metrics().record_delivery(true);
                debug!(
                    %lane,
                    recipient,
                    kind = task.payload().kind(),
                    message_id = ?delivery.message_id,
                    "Delivered"
                );
            }
            Err(e) => {
                failed += 1;
                shared.metrics().record_delivery(false);
                error!(%lane, recipient, kind = task.payload().kind(), error = %e, "Delivery failed");
            }
        }

        tokio::time::sleep(shared.config().pacing_interval).await;
    }

    info!(delivered, failed, "Dispatch worker drained both lanes");
}
