//! # Sentinel Common Library
//!
//! Shared code for the sentinel pipeline crates:
//! - Common error type
//! - Bootstrap TOML configuration loading
//! - Outbound pipeline events (alert / latency) and the event channel publisher

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{event_channel, AlertLevel, EmitError, EventPublisher, LatencyLabel, PipelineEvent};
