use chrono::{DateTime, Utc};

use crate::{
    db::models::{NewSensorRecord, SchemaCapabilities, SensorRecord},
    fusion::models::FusedReading,
};

/// Outcome of one persistence tick.
///
/// `assess` only ever yields `Collecting` or `CompletePendingWrite`; a tick
/// moves to `Written` once storage has accepted the record.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveCycle {
    /// At least one required field has never been received.
    Collecting { missing: Vec<&'static str> },
    /// Every required field is present; this record should be stored.
    CompletePendingWrite(NewSensorRecord),
    /// Storage accepted the record.
    Written(SensorRecord),
}

impl SaveCycle {
    /// Decide whether `reading` is complete enough to store. Humidity is only
    /// required (and only carried) when the schema has a column for it.
    pub fn assess(
        reading: &FusedReading,
        schema: SchemaCapabilities,
        captured_at: DateTime<Utc>,
    ) -> Self {
        match (reading.temperature, reading.light) {
            (Some(temperature), Some(light))
                if !schema.has_humidity || reading.humidity.is_some() =>
            {
                SaveCycle::CompletePendingWrite(NewSensorRecord {
                    temperature,
                    humidity: reading.humidity.filter(|_| schema.has_humidity),
                    light,
                    captured_at,
                })
            }
            _ => SaveCycle::Collecting {
                missing: reading.missing_fields(schema.has_humidity),
            },
        }
    }
}
