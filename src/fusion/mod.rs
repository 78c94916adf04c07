pub mod models;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::db::models::SensorRecord;

use self::models::{BroadcastSnapshot, FusedReading, Measurement};

const BROADCAST_CAPACITY: usize = 64;

/// Process-wide fused reading plus the fan-out channel to live viewers.
///
/// Cheap to clone; every clone shares the same state. Each update is applied
/// and broadcast while the write lock is held, so a snapshot always reflects
/// a single consistent point in the update sequence, and a new subscriber
/// sees every update after its initial snapshot exactly once.
#[derive(Clone)]
pub struct FusionState {
    reading: Arc<RwLock<FusedReading>>,
    updates: broadcast::Sender<BroadcastSnapshot>,
}

impl Default for FusionState {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionState {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            reading: Arc::new(RwLock::new(FusedReading::default())),
            updates,
        }
    }

    /// Overwrite one field and push the full resulting snapshot to every viewer.
    ///
    /// Delivery is fire-and-forget: with no viewers connected the snapshot is
    /// simply dropped.
    pub async fn apply(&self, measurement: Measurement, at: DateTime<Utc>) -> BroadcastSnapshot {
        let mut reading = self.reading.write().await;
        reading.apply(measurement);

        let snapshot = BroadcastSnapshot::capture(&reading, at);
        let _ = self.updates.send(snapshot.clone());
        snapshot
    }

    /// Copy of the current fused reading.
    pub async fn current(&self) -> FusedReading {
        self.reading.read().await.clone()
    }

    /// Register a viewer: returns the snapshot to send immediately plus the
    /// receiver for every later update.
    pub async fn subscribe(&self) -> (BroadcastSnapshot, broadcast::Receiver<BroadcastSnapshot>) {
        let reading = self.reading.read().await;
        let rx = self.updates.subscribe();
        (BroadcastSnapshot::capture(&reading, Utc::now()), rx)
    }

    /// Fill sensor fields from a stored record. Nothing is broadcast and the
    /// actuator status is left alone.
    pub async fn seed(&self, record: &SensorRecord) {
        let mut reading = self.reading.write().await;
        reading.temperature = Some(record.temperature);
        reading.humidity = record.humidity;
        reading.light = Some(record.light);
    }

    /// Number of viewers currently subscribed.
    pub fn viewer_count(&self) -> usize {
        self.updates.receiver_count()
    }
}
