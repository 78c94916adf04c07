use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::{SensorRecord, Statistics};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorRecordDto {
    pub id: i64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage; `null` when the deployment stores no humidity.
    pub humidity: Option<f64>,
    pub light: i32,
    pub captured_at: DateTime<Utc>,
}

impl From<SensorRecord> for SensorRecordDto {
    fn from(r: SensorRecord) -> Self {
        Self {
            id: r.id,
            temperature: r.temperature,
            humidity: r.humidity,
            light: r.light,
            captured_at: r.captured_at,
        }
    }
}

/// Query string for `GET /api/history`. Kept as raw text so a non-numeric
/// value falls back to the default instead of being rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// One of 10, 50 or 100; anything else means 100.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub limit: i64,
    pub data: Vec<SensorRecordDto>,
    pub request_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub data: Vec<SensorRecordDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataResponse {
    pub success: bool,
    pub data: Option<SensorRecordDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub deleted_rows: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: Statistics,
}

/// Request body for `POST /api/control/led`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LedCommandRequest {
    /// `"ON"` or `"OFF"`, exactly.
    #[serde(default)]
    pub command: Option<String>,
}

/// A stored record tied at the maximum temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaxTemperatureRecord {
    pub id: i64,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub light: i32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthYear {
    /// `"<month>-<year>"`, month not zero-padded, e.g. `"3-2025"`.
    pub month_year: String,
}

/// Response for `GET /api/summary`. Returned bare, without a `success` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    /// Rounded to two decimals.
    pub mean_temperature: Option<f64>,
    pub max_temperature_records: Vec<MaxTemperatureRecord>,
    pub max_temperature_months: Vec<MonthYear>,
}
