use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::messages::GasReadingMessage;

/// Fan-out of gas readings to any number of in-process subscribers
#[derive(Clone)]
pub struct ReadingPublisher {
    tx: broadcast::Sender<GasReadingMessage>,
    sensor_stats: Arc<RwLock<HashMap<String, SensorStats>>>,
}

/// Per-sensor health as seen by the publisher
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorStats {
    pub messages_sent: u64,
    pub errors: u64,
    pub last_seq: u64,
    pub last_error: Option<String>,
}

impl ReadingPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sensor_stats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GasReadingMessage> {
        self.tx.subscribe()
    }

    /// Publish a reading; returns how many subscribers received it
    pub async fn publish(&self, message: GasReadingMessage) -> usize {
        {
            let mut stats = self.sensor_stats.write().await;
            let entry = stats.entry(message.h.sensor_id.clone()).or_default();
            entry.messages_sent += 1;
            entry.last_seq = message.h.seq;
            entry.last_error = None;
        }

        // No active subscribers is fine
        self.tx.send(message).unwrap_or(0)
    }

    /// Record a failed sample for `sensor_id`
    pub async fn report_error(&self, sensor_id: &str, error: String) {
        let mut stats = self.sensor_stats.write().await;
        let entry = stats.entry(sensor_id.to_string()).or_default();
        entry.errors += 1;
        entry.last_error = Some(error);
    }

    pub async fn stats(&self, sensor_id: &str) -> Option<SensorStats> {
        self.sensor_stats.read().await.get(sensor_id).cloned()
    }
}

impl Default for ReadingPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Log every published reading as one JSON line until the channel closes
pub async fn log_readings(mut rx: broadcast::Receiver<GasReadingMessage>) {
    loop {
        match rx.recv().await {
            Ok(msg) => match msg.to_json() {
                Ok(json) => info!("[{}] {}", msg.sensor_id(), json),
                Err(e) => warn!("[{}] failed to encode reading: {}", msg.sensor_id(), e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("[publisher] log subscriber lagged, {} readings skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("[publisher] channel closed");
                break;
            }
        }
    }
}
