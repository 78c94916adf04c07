use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info};

use super::cycle::SaveCycle;
use crate::{db::repository::SensorRepository, fusion::FusionState};

pub struct PersistenceService {
    repo: Arc<dyn SensorRepository>,
    fusion: FusionState,
    interval: Duration,
}

impl PersistenceService {
    pub fn new(repo: Arc<dyn SensorRepository>, fusion: FusionState, interval_secs: u64) -> Self {
        Self {
            repo,
            fusion,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the persistence timer indefinitely. The first tick fires one full
    /// period after start.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            has_humidity = self.repo.schema().has_humidity,
            "Persistence timer started"
        );
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // A failed write is not retried; the next tick stores whatever
            // the fused reading holds then.
            if let Err(e) = self.tick().await {
                error!(error = %e, "Failed to save sensor snapshot; sample dropped");
            }
        }
    }

    /// One timer cycle: take a snapshot, and store it if it is complete.
    pub async fn tick(&self) -> anyhow::Result<SaveCycle> {
        // Copy out first so the storage write never holds the fusion lock.
        let reading = self.fusion.current().await;

        match SaveCycle::assess(&reading, self.repo.schema(), Utc::now()) {
            SaveCycle::CompletePendingWrite(record) => {
                let stored = self.repo.insert(&record).await?;
                info!(
                    id = stored.id,
                    temperature = stored.temperature,
                    humidity = ?stored.humidity,
                    light = stored.light,
                    "Sensor snapshot saved"
                );
                Ok(SaveCycle::Written(stored))
            }
            collecting => {
                info!(
                    temperature = ?reading.temperature,
                    humidity = ?reading.humidity,
                    light = ?reading.light,
                    cycle = ?collecting,
                    "Waiting for complete data; nothing saved"
                );
                Ok(collecting)
            }
        }
    }
}
