//! Bounded channel fabric connecting the pipeline stages
//!
//! ```text
//! feeds ─▶ [input ×3] ─▶ services ─▶ [processing] ─▶ orchestrator
//!                         │                            │
//!                         └──────▶ [events] ◀──────────┘ ─▶ fan-out
//! ```
//!
//! Every channel is a fixed-capacity FIFO: senders wait when full,
//! receivers wait when empty.

use crate::records::{NormalizedRecord, RawRecord};
use sentinel_common::events::EventReceiver;
use sentinel_common::{event_channel, EventPublisher};
use tokio::sync::mpsc;

/// Both ends of one per-domain input channel
pub struct InputChannel {
    pub tx: mpsc::Sender<RawRecord>,
    pub rx: mpsc::Receiver<RawRecord>,
}

impl InputChannel {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx }
    }
}

/// All pipeline channels, created together at startup and then split
/// among their producers and consumers
pub struct ChannelFabric {
    pub genetic: InputChannel,
    pub biochemical: InputChannel,
    pub physical: InputChannel,
    pub processing_tx: mpsc::Sender<NormalizedRecord>,
    pub processing_rx: mpsc::Receiver<NormalizedRecord>,
    pub events: EventPublisher,
    pub events_rx: EventReceiver,
}

impl ChannelFabric {
    pub fn new(input_capacity: usize, processing_capacity: usize, event_capacity: usize) -> Self {
        let (processing_tx, processing_rx) = mpsc::channel(processing_capacity);
        let (events, events_rx) = event_channel(event_capacity);
        Self {
            genetic: InputChannel::new(input_capacity),
            biochemical: InputChannel::new(input_capacity),
            physical: InputChannel::new(input_capacity),
            processing_tx,
            processing_rx,
            events,
            events_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Domain;
    use serde_json::json;

    #[tokio::test]
    async fn test_input_channel_is_bounded_fifo() {
        let fabric = ChannelFabric::new(2, 4, 4);
        let tx = fabric.genetic.tx.clone();
        let mut rx = fabric.genetic.rx;

        for i in 0..2 {
            tx.send(RawRecord::from_json(Domain::Genetic, json!({"n": i})))
                .await
                .expect("room available");
        }
        assert!(tx
            .try_send(RawRecord::from_json(Domain::Genetic, json!({"n": 2})))
            .is_err());

        for i in 0..2 {
            let record = rx.recv().await.expect("record queued");
            assert_eq!(record.get("n"), Some(&json!(i)));
        }
    }
}
