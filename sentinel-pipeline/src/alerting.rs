//! Rate-limited critical event alerts
//!
//! The [`AlertManager`] turns critical records into `alert` events on the
//! outbound event channel. Repeats of the same message for the same sample
//! or subject are suppressed for a cooldown window. Delivery failures are
//! logged and counted, never returned to the caller.

use crate::metrics::{category, MetricsCollector};
use crate::records::NormalizedRecord;
use sentinel_common::{AlertLevel, EventPublisher, PipelineEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// A critical condition raised by a domain service
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub level: AlertLevel,
    pub message: String,
    pub triggering_data: NormalizedRecord,
}

/// Cooldown identity: alert text plus sample/subject id when the record has one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    message: String,
    identity: Option<String>,
}

impl CooldownKey {
    pub fn new(message: &str, data: &NormalizedRecord) -> Self {
        Self {
            message: message.to_string(),
            identity: data.identity().map(str::to_string),
        }
    }
}

/// Alert manager tuning
#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Minimum time between two alerts with the same key
    pub cooldown: Duration,
    /// Upper bound on waiting for room in the event channel
    pub send_timeout: Duration,
    /// Simulated network latency after a successful push
    pub delivery_delay: Duration,
    /// Map size above which stale keys are swept
    pub max_cooldown_entries: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(60),
            send_timeout: Duration::from_secs(1),
            delivery_delay: Duration::from_millis(100),
            max_cooldown_entries: 10_000,
        }
    }
}

/// Cooldown-aware alert notifier
pub struct AlertManager {
    publisher: EventPublisher,
    metrics: Arc<MetricsCollector>,
    settings: AlertSettings,
    last_sent: Mutex<HashMap<CooldownKey, Instant>>,
}

impl AlertManager {
    pub fn new(
        publisher: EventPublisher,
        metrics: Arc<MetricsCollector>,
        settings: AlertSettings,
    ) -> Self {
        Self {
            publisher,
            metrics,
            settings,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Raise an alert built by a domain service
    pub async fn raise(&self, event: &AlertEvent) {
        self.send_alert(event.level, &event.message, &event.triggering_data)
            .await;
    }

    /// Send an alert unless its key is still cooling down
    ///
    /// Suppressed alerts return immediately and touch no metrics. Otherwise
    /// the cooldown is committed before delivery is attempted, so a failed
    /// push still consumes the window. Alert latency is recorded whether or
    /// not the push succeeded.
    pub async fn send_alert(&self, level: AlertLevel, message: &str, data: &NormalizedRecord) {
        let start = Instant::now();
        let key = CooldownKey::new(message, data);

        if !self.try_commit(key, start) {
            debug!(alert = message, identity = ?data.identity(), "Alert suppressed by cooldown");
            return;
        }

        warn!(
            level = %level,
            identity = data.identity().unwrap_or("unknown"),
            "ALERT [{}]: {} | Sample/Subject: {}",
            level,
            message,
            data.identity().unwrap_or("unknown")
        );

        let event = PipelineEvent::Alert {
            level,
            message: message.to_string(),
        };
        match self
            .publisher
            .emit_timeout(event, self.settings.send_timeout)
            .await
        {
            Ok(()) => tokio::time::sleep(self.settings.delivery_delay).await,
            Err(e) => {
                error!(error = %e, alert = message, "Failed to deliver alert");
                self.metrics.record_error(category::ALERTING);
            }
        }

        self.metrics.record_alert_latency(start);
    }

    /// Number of keys currently tracked
    pub fn cooldown_entries(&self) -> usize {
        self.last_sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Record `now` for `key` unless it was sent within the cooldown window
    fn try_commit(&self, key: CooldownKey, now: Instant) -> bool {
        let mut last_sent = self.last_sent.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = last_sent.get(&key) {
            if now.saturating_duration_since(*previous) < self.settings.cooldown {
                return false;
            }
        }
        last_sent.insert(key, now);

        if last_sent.len() > self.settings.max_cooldown_entries {
            prune(
                &mut last_sent,
                now,
                self.settings.cooldown,
                self.settings.max_cooldown_entries,
            );
        }
        true
    }
}

/// Drop expired keys, then the oldest ones until at most `limit` remain
fn prune(map: &mut HashMap<CooldownKey, Instant>, now: Instant, cooldown: Duration, limit: usize) {
    map.retain(|_, sent| now.saturating_duration_since(*sent) < cooldown);

    if map.len() > limit {
        let mut by_age: Vec<(CooldownKey, Instant)> =
            map.iter().map(|(k, t)| (k.clone(), *t)).collect();
        by_age.sort_by_key(|(_, sent)| *sent);
        let excess = map.len() - limit;
        for (key, _) in by_age.into_iter().take(excess) {
            map.remove(&key);
        }
    }
}
