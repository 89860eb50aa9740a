//! Outbound pipeline events
//!
//! Provides the tagged messages pushed to live observers and the bounded event
//! channel that carries them from producers (alert manager, orchestrator) to
//! the single fan-out consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Critical,
    Warning,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::Warning => "WARNING",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency series a processing-time measurement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatencyLabel {
    Genetic,
    Biochemical,
    Physical,
}

impl fmt::Display for LatencyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LatencyLabel::Genetic => "Genetic",
            LatencyLabel::Biochemical => "Biochemical",
            LatencyLabel::Physical => "Physical",
        };
        f.write_str(label)
    }
}

/// Messages placed on the outbound event channel
///
/// Serialized with a `type` tag so observers can switch on it:
/// - `{"type":"alert","level":"CRITICAL","message":"..."}`
/// - `{"type":"latency","label":"Genetic","value":12.5}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PipelineEvent {
    /// Critical condition detected on a normalized record
    Alert {
        /// Alert severity
        level: AlertLevel,
        /// Human-readable alert text
        message: String,
    },

    /// Per-task processing latency
    Latency {
        /// Which domain the measurement belongs to
        label: LatencyLabel,
        /// Elapsed milliseconds
        value: f64,
    },
}

impl PipelineEvent {
    /// Event type string (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::Alert { .. } => "alert",
            PipelineEvent::Latency { .. } => "latency",
        }
    }
}

/// Failure to place an event on the channel
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    /// The consumer side has been dropped
    #[error("event channel closed")]
    Closed,

    /// No capacity became available within the allowed wait
    #[error("timed out after {0:?} waiting for event channel capacity")]
    Timeout(Duration),
}

/// Receiving side of the event channel (owned by the fan-out task)
pub type EventReceiver = mpsc::Receiver<PipelineEvent>;

/// Create the bounded outbound event channel
pub fn event_channel(capacity: usize) -> (EventPublisher, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventPublisher { tx }, rx)
}

/// Producer handle for the outbound event channel
///
/// Cheap to clone; every producer holds its own clone. The channel closes
/// once every publisher is dropped.
#[derive(Clone, Debug)]
pub struct EventPublisher {
    tx: mpsc::Sender<PipelineEvent>,
}

impl EventPublisher {
    /// Emit an event, waiting at most `timeout` for capacity
    pub async fn emit_timeout(
        &self,
        event: PipelineEvent,
        timeout: Duration,
    ) -> Result<(), EmitError> {
        self.tx.send_timeout(event, timeout).await.map_err(|e| match e {
            mpsc::error::SendTimeoutError::Closed(_) => EmitError::Closed,
            mpsc::error::SendTimeoutError::Timeout(_) => EmitError::Timeout(timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_event_wire_format() {
        let event = PipelineEvent::Alert {
            level: AlertLevel::Critical,
            message: "Critical event detected in PhysicalService".to_string(),
        };

        let json = serde_json::to_value(&event).expect("alert should serialize");
        assert_eq!(json["type"], "alert");
        assert_eq!(json["level"], "CRITICAL");
        assert_eq!(json["message"], "Critical event detected in PhysicalService");
    }

    #[test]
    fn test_latency_event_wire_format() {
        let event = PipelineEvent::Latency {
            label: LatencyLabel::Biochemical,
            value: 12.5,
        };

        let json = serde_json::to_string(&event).expect("latency should serialize");
        assert_eq!(json, r#"{"type":"latency","label":"Biochemical","value":12.5}"#);
        assert_eq!(event.event_type(), "latency");
    }

    #[tokio::test]
    async fn test_emit_delivers_in_order() {
        let (publisher, mut rx) = event_channel(4);

        for value in [1.0, 2.0, 3.0] {
            publisher
                .emit_timeout(
                    PipelineEvent::Latency {
                        label: LatencyLabel::Genetic,
                        value,
                    },
                    Duration::from_millis(10),
                )
                .await
                .expect("emit should succeed");
        }

        for expected in [1.0, 2.0, 3.0] {
            match rx.recv().await {
                Some(PipelineEvent::Latency { value, .. }) => assert_eq!(value, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_emit_timeout_on_full_channel() {
        let (publisher, _rx) = event_channel(1);
        let event = PipelineEvent::Alert {
            level: AlertLevel::Warning,
            message: "first".to_string(),
        };
        publisher
            .emit_timeout(event.clone(), Duration::from_millis(10))
            .await
            .expect("first emit fits");

        let result = publisher
            .emit_timeout(event, Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(EmitError::Timeout(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_reports_closed() {
        let (publisher, rx) = event_channel(4);
        drop(rx);

        let result = publisher
            .emit_timeout(
                PipelineEvent::Latency {
                    label: LatencyLabel::Physical,
                    value: 0.0,
                },
                Duration::from_millis(10),
            )
            .await;
        assert_eq!(result, Err(EmitError::Closed));
    }
}
