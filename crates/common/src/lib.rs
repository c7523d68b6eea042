//! Common utilities and shared types for beacon.
//!
//! This crate provides foundational components used across all beacon crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Metrics**: Dispatch and directory counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use beacon_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Pacing floor: {:?}", config.dispatch.pacing_interval());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;

pub use config::{
    BotConfig, Config, DatabaseConfig, DispatchConfig, TransportConfig, TransportMode,
};
pub use error::{AppError, AppResult};
pub use metrics::{Metrics, MetricsSnapshot, get_metrics};
