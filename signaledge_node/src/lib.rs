//! # SignalEdge Virtual Sensor Node
//!
//! Emulates a temperature probe + fan node and exposes its live state to
//! callers through three concurrent access paths:
//!
//! - **Control surface** — discrete validated commands and a consistent
//!   stats snapshot ([`ControlRequest`] / [`NodeContext::execute`]).
//! - **Bulk read** — raw, length-capped copy-out of the device record
//!   ([`NodeContext::bulk_read`]).
//! - **Shared-memory projection** — a live mapping of the record's
//!   backing page that deliberately bypasses the store lock
//!   ([`StateProjection`]).
//!
//! A background [`UpdateEngine`] advances the record on a fixed cadence:
//! bounded noise, fan-driven decay, a temperature floor, the derived alert
//! flag, and a bounded history ring, then pushes indicator signals and a
//! status line to external sinks, best-effort.
//!
//! ## Consistency model
//!
//! Engine ticks, control commands, and bulk reads all run under one mutex
//! and are strictly serialized; every lock-mediated reader observes a
//! record consistent with some completed update. The projection has no
//! such guarantee — it observes (and may produce) torn values while an
//! update is in flight. That gap is intentional and documented on
//! [`StateProjection`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use signaledge_node::{ControlRequest, NodeContext, UpdateEngine};
//! use signaledge::config::NodeConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NodeConfig::default();
//! let ctx = Arc::new(NodeContext::create(&config)?);
//!
//! let engine = UpdateEngine::new(ctx.clone(), Duration::from_millis(1000));
//! tokio::spawn(engine.run());
//!
//! ctx.execute(ControlRequest::SetFanSpeed(3))?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod engine;
pub mod error;
pub mod projection;
pub mod read;
pub mod ring;
pub mod sink;
pub mod state;

pub use control::{ControlRequest, ControlResponse, DeviceStats, STATS_SIZE};
pub use engine::{EntropyNoise, NoiseSource, UpdateEngine};
pub use error::{NodeError, NodeResult, SinkError};
pub use projection::StateProjection;
pub use ring::HistoryRing;
pub use sink::{DisplaySink, IndicatorSignals, IndicatorSink, LogDisplaySink, LogIndicatorSink};
pub use state::{DeviceState, NodeContext, RuntimeConfig, STATE_SIZE, SegmentMeta, StateBacking};

/// Initialize tracing for the node process.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
