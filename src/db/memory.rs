//! In-memory `SensorRepository` for tests that should not need Postgres.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{
    models::{NewSensorRecord, SchemaCapabilities, SensorRecord, Statistics},
    repository::SensorRepository,
};

#[derive(Default)]
struct Table {
    rows: Vec<SensorRecord>,
    last_id: i64,
}

pub struct MemoryRepository {
    schema: SchemaCapabilities,
    table: Mutex<Table>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new(schema: SchemaCapabilities) -> Self {
        Self {
            schema,
            table: Mutex::new(Table::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_humidity() -> Self {
        Self::new(SchemaCapabilities { has_humidity: true })
    }

    pub fn without_humidity() -> Self {
        Self::new(SchemaCapabilities { has_humidity: false })
    }

    /// Make every subsequent call fail, as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<SensorRecord> {
        self.table.lock().unwrap().rows.clone()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("storage unavailable");
        }
        Ok(())
    }

    fn newest_first(&self) -> Vec<SensorRecord> {
        let mut rows = self.rows();
        rows.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then(b.id.cmp(&a.id)));
        rows
    }
}

#[async_trait]
impl SensorRepository for MemoryRepository {
    fn schema(&self) -> SchemaCapabilities {
        self.schema
    }

    async fn insert(&self, record: &NewSensorRecord) -> Result<SensorRecord> {
        self.check()?;
        let mut table = self.table.lock().unwrap();
        table.last_id += 1;
        let row = SensorRecord {
            id: table.last_id,
            temperature: record.temperature,
            humidity: record.humidity.filter(|_| self.schema.has_humidity),
            light: record.light,
            captured_at: record.captured_at,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn history(&self, limit: i64) -> Result<Vec<SensorRecord>> {
        self.check()?;
        let mut rows = self.newest_first();
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn all(&self) -> Result<Vec<SensorRecord>> {
        self.check()?;
        Ok(self.newest_first())
    }

    async fn by_id(&self, id: i64) -> Result<Option<SensorRecord>> {
        self.check()?;
        Ok(self.rows().into_iter().find(|r| r.id == id))
    }

    async fn latest(&self) -> Result<Option<SensorRecord>> {
        self.check()?;
        Ok(self.newest_first().into_iter().next())
    }

    async fn count(&self) -> Result<i64> {
        self.check()?;
        Ok(self.rows().len() as i64)
    }

    async fn reset(&self) -> Result<u64> {
        self.check()?;
        let mut table = self.table.lock().unwrap();
        let deleted = table.rows.len() as u64;
        *table = Table::default();
        Ok(deleted)
    }

    async fn statistics(&self) -> Result<Statistics> {
        self.check()?;
        let rows = self.rows();
        if rows.is_empty() {
            return Ok(Statistics::default());
        }

        let temps: Vec<f64> = rows.iter().map(|r| r.temperature).collect();
        let hums: Vec<f64> = rows.iter().filter_map(|r| r.humidity).collect();
        let lights: Vec<f64> = rows.iter().map(|r| r.light as f64).collect();

        Ok(Statistics {
            min_temperature: min(&temps),
            max_temperature: max(&temps),
            avg_temperature: mean(&temps),
            min_humidity: min(&hums),
            max_humidity: max(&hums),
            avg_humidity: mean(&hums),
            min_light: rows.iter().map(|r| r.light).min(),
            max_light: rows.iter().map(|r| r.light).max(),
            avg_light: mean(&lights),
            total_records: rows.len() as i64,
        })
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
