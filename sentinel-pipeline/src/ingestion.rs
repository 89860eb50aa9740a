//! Simulated sensor feeds
//!
//! One producer per domain emits raw records at random intervals onto its
//! domain's input channel. A fraction of records is deliberately abnormal
//! so the alert path gets exercised.

use crate::records::{Domain, RawRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Base interval bounds in seconds at speed 1.0
pub fn interval_bounds(domain: Domain) -> (f64, f64) {
    match domain {
        Domain::Genetic => (0.5, 2.0),
        Domain::Biochemical => (0.2, 1.0),
        Domain::Physical => (1.0, 3.0),
    }
}

/// Longest delay a feed will wait between records
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Random delay before the next record, scaled by `speed`
///
/// Capped at [`MAX_INTERVAL`], which also covers speeds so small the
/// scaled delay overflows `Duration`.
pub fn next_interval<R: Rng>(domain: Domain, speed: f64, rng: &mut R) -> Duration {
    let (low, high) = interval_bounds(domain);
    Duration::try_from_secs_f64(rng.gen_range(low..=high) / speed)
        .map_or(MAX_INTERVAL, |delay| delay.min(MAX_INTERVAL))
}

/// Generate one raw record for `domain`
pub fn generate<R: Rng>(domain: Domain, rng: &mut R) -> RawRecord {
    let value = match domain {
        Domain::Genetic => {
            let mut sequence: Vec<u8> = b"ATCG"[..].repeat(rng.gen_range(5..=10));
            let substitute = if rng.gen_bool(0.1) {
                Some(b'T')
            } else if rng.gen_bool(0.05) {
                Some(b'G')
            } else {
                None
            };
            if let Some(base) = substitute {
                let pos = rng.gen_range(0..sequence.len());
                sequence[pos] = base;
            }

            json!({
                "sample_id": Uuid::new_v4().to_string(),
                "raw_sequence": String::from_utf8_lossy(&sequence),
                "metadata": {"source_lab": "Lab-01"}
            })
        }
        Domain::Biochemical => {
            let toxin: f64 = if rng.gen_bool(0.1) {
                rng.gen_range(80.1..=95.0)
            } else {
                rng.gen_range(10.0..=50.0)
            };

            json!({
                "sample_id": format!("bio_{}", rng.gen_range(1000..=9999)),
                "toxin_level": format!("{:.2} ppm", toxin),
                "protein_x": rng.gen_range(1.0..=15.0)
            })
        }
        Domain::Physical => {
            let mut heart_rate: i64 = rng.gen_range(55..=100);
            let mut spo2: i64 = rng.gen_range(95..=99);

            let roll: f64 = rng.gen();
            if roll < 0.05 {
                heart_rate = 0;
            } else if roll < 0.10 {
                heart_rate = rng.gen_range(191..=220);
            } else if roll < 0.15 {
                spo2 = rng.gen_range(80..=89);
            }

            json!({
                "subject_id": format!("subject_{}", rng.gen_range(1..=10)),
                "vitals": {
                    "heart_rate": heart_rate,
                    "spo2": format!("{}%", spo2)
                }
            })
        }
    };

    RawRecord::from_json(domain, value)
}

/// Emit records for `domain` until cancelled or the channel closes
///
/// Blocks when the input channel is full.
pub async fn run_feed(
    domain: Domain,
    tx: mpsc::Sender<RawRecord>,
    speed: f64,
    cancel: CancellationToken,
) {
    let mut rng = StdRng::from_entropy();
    info!(feed = %domain, speed, "Simulated feed started");

    loop {
        let delay = next_interval(domain, speed, &mut rng);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let record = generate(domain, &mut rng);
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(record) => {
                if sent.is_err() {
                    debug!(feed = %domain, "Input channel closed");
                    break;
                }
            }
        }
    }

    info!(feed = %domain, "Simulated feed stopped");
}
