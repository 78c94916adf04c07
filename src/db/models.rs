use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// What the deployed `sensor_records` table can hold.
///
/// Probed once at startup and passed to everything that reads or writes rows;
/// never re-derived per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub has_humidity: bool,
}

/// A persisted snapshot. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: i64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage. Always `None` when the schema has no column.
    pub humidity: Option<f64>,
    pub light: i32,
    pub captured_at: DateTime<Utc>,
}

/// A complete snapshot that is about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorRecord {
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub light: i32,
    pub captured_at: DateTime<Utc>,
}

/// Aggregates over every stored record.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_light: Option<i32>,
    pub max_light: Option<i32>,
    pub avg_light: Option<f64>,
    pub total_records: i64,
}
