//! Dispatch worker.

mod pacing;

pub(crate) use pacing::run;
pub use pacing::{WorkerConfig, execute_task};
