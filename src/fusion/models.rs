use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_ACTUATOR_STATUS: &str = "OFF";

/// One decoded value from a single inbound topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    /// Degrees Celsius
    Temperature(f64),
    /// Relative humidity percentage
    Humidity(f64),
    /// Raw light-sensor (LDR) level
    Light(i32),
    /// Last status reported by the relay, usually `"ON"` or `"OFF"`
    ActuatorStatus(String),
}

/// The most recent value per measured quantity.
///
/// Fields are overwritten independently as their topics deliver, so a copy of
/// this record may combine values that arrived at different times.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<i32>,
    pub actuator_status: String,
}

impl Default for FusedReading {
    fn default() -> Self {
        Self {
            temperature: None,
            humidity: None,
            light: None,
            actuator_status: DEFAULT_ACTUATOR_STATUS.to_owned(),
        }
    }
}

impl FusedReading {
    /// Overwrite exactly the field that `measurement` belongs to.
    pub fn apply(&mut self, measurement: Measurement) {
        match measurement {
            Measurement::Temperature(v) => self.temperature = Some(v),
            Measurement::Humidity(v) => self.humidity = Some(v),
            Measurement::Light(v) => self.light = Some(v),
            Measurement::ActuatorStatus(s) => self.actuator_status = s,
        }
    }

    /// Names of the fields a stored record needs but this reading lacks.
    /// Humidity only counts when the storage schema has a column for it.
    pub fn missing_fields(&self, require_humidity: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.temperature.is_none() {
            missing.push("temperature");
        }
        if require_humidity && self.humidity.is_none() {
            missing.push("humidity");
        }
        if self.light.is_none() {
            missing.push("light");
        }
        missing
    }
}

/// Point-in-time copy of the fused reading pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastSnapshot {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub light: Option<i32>,
    pub actuator_status: String,
    pub timestamp: DateTime<Utc>,
}

impl BroadcastSnapshot {
    pub fn capture(reading: &FusedReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            light: reading.light,
            actuator_status: reading.actuator_status.clone(),
            timestamp,
        }
    }
}

/// Frame written to the real-time channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RealtimeUpdate(BroadcastSnapshot),
}
