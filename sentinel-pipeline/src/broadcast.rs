//! Broadcast fan-out to live observers
//!
//! A single task drains the outbound event channel, serializes each event
//! once and offers it to every registered observer. Each observer has its
//! own bounded buffer. The fan-out never waits on an observer:
//! - full buffer: the message is skipped for that observer (logged as lag)
//! - closed receiver: the observer is unregistered

use sentinel_common::events::EventReceiver;
use sentinel_common::PipelineEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub type ObserverId = u64;

/// One serialized event as delivered to observers
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverMessage {
    /// Event `type` tag (`alert` or `latency`)
    pub event_type: &'static str,
    /// JSON body
    pub data: Arc<str>,
}

/// Receiving end held by one observer connection
pub struct Observer {
    pub id: ObserverId,
    pub rx: mpsc::Receiver<ObserverMessage>,
}

/// Per-message delivery counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub lagged: usize,
    pub removed: usize,
}

/// Currently connected observers
pub struct ObserverRegistry {
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<ObserverMessage>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl ObserverRegistry {
    /// `buffer` is the per-observer message capacity
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Add an observer; it receives only events delivered from now on
    pub fn register(&self) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.lock().insert(id, tx);
        debug!(observer = id, "Observer registered");
        Observer { id, rx }
    }

    pub fn unregister(&self, id: ObserverId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop every observer so their streams end
    pub fn close_all(&self) {
        let closed = std::mem::take(&mut *self.lock()).len();
        debug!(closed, "Observers closed");
    }

    /// Offer one message to every observer without waiting
    pub fn deliver(&self, message: &ObserverMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut observers = self.lock();

        observers.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(observer = *id, "Observer lagging, message skipped");
                report.lagged += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(observer = *id, "Observer disconnected, unregistering");
                report.removed += 1;
                false
            }
        });

        report
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObserverId, mpsc::Sender<ObserverMessage>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drain `events` into `registry` until cancelled or every publisher is gone
///
/// On cancellation, events already queued are still delivered.
pub async fn run_fan_out(
    mut events: EventReceiver,
    registry: Arc<ObserverRegistry>,
    cancel: CancellationToken,
) {
    info!("Broadcast fan-out started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                while let Ok(event) = events.try_recv() {
                    publish(&registry, &event);
                }
                break;
            }
            event = events.recv() => match event {
                Some(event) => publish(&registry, &event),
                None => break,
            },
        }
    }

    info!("Broadcast fan-out stopped");
}

fn publish(registry: &ObserverRegistry, event: &PipelineEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let message = ObserverMessage {
                event_type: event.event_type(),
                data: Arc::from(json),
            };
            let report = registry.deliver(&message);
            debug!(
                event_type = message.event_type,
                delivered = report.delivered,
                "Broadcast event"
            );
        }
        Err(e) => error!("Failed to serialize event: {}", e),
    }
}
