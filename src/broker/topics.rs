use thiserror::Error;

use crate::fusion::models::Measurement;

// Suffixes appended to the configured topic prefix.
const TEMPERATURE: &str = "sensor/temperature_c";
const HUMIDITY: &str = "sensor/humidity";
const LIGHT: &str = "sensor/ldr";
const ACTUATOR_STATUS: &str = "status/relay";
const LED_COMMAND: &str = "control_led";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("expected a number, got {0:?}")]
    NotNumeric(String),
    #[error("number out of range: {0:?}")]
    OutOfRange(String),
}

/// Inbound topics the link subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorTopic {
    Temperature,
    Humidity,
    Light,
    ActuatorStatus,
}

impl SensorTopic {
    /// Decode a plain-text payload into the scalar type this topic carries.
    pub fn decode(self, payload: &[u8]) -> Result<Measurement, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;

        match self {
            SensorTopic::Temperature => parse_float(text).map(Measurement::Temperature),
            SensorTopic::Humidity => parse_float(text).map(Measurement::Humidity),
            SensorTopic::Light => parse_level(text).map(Measurement::Light),
            SensorTopic::ActuatorStatus => Ok(Measurement::ActuatorStatus(text.trim().to_owned())),
        }
    }
}

/// The exact topic strings used on the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub temperature: String,
    pub humidity: String,
    pub light: String,
    pub actuator_status: String,
    /// Outbound only.
    pub led_command: String,
}

impl Topics {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let topic = |suffix: &str| {
            if prefix.is_empty() {
                suffix.to_owned()
            } else {
                format!("{prefix}/{suffix}")
            }
        };

        Self {
            temperature: topic(TEMPERATURE),
            humidity: topic(HUMIDITY),
            light: topic(LIGHT),
            actuator_status: topic(ACTUATOR_STATUS),
            led_command: topic(LED_COMMAND),
        }
    }

    /// Topics subscribed to in a single batch on every (re)connect.
    pub fn inbound(&self) -> [&str; 4] {
        [
            &self.temperature,
            &self.humidity,
            &self.light,
            &self.actuator_status,
        ]
    }

    /// Exact-match routing; `None` for anything not subscribed to.
    pub fn route(&self, topic: &str) -> Option<SensorTopic> {
        if topic == self.temperature {
            Some(SensorTopic::Temperature)
        } else if topic == self.humidity {
            Some(SensorTopic::Humidity)
        } else if topic == self.light {
            Some(SensorTopic::Light)
        } else if topic == self.actuator_status {
            Some(SensorTopic::ActuatorStatus)
        } else {
            None
        }
    }
}

fn parse_float(text: &str) -> Result<f64, DecodeError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| DecodeError::NotNumeric(trimmed.to_owned()))?;
    // "NaN" and "inf" parse successfully but are not readings.
    if !value.is_finite() {
        return Err(DecodeError::NotNumeric(trimmed.to_owned()));
    }
    Ok(value)
}

/// Light levels are integers; a decimal payload is truncated toward zero.
fn parse_level(text: &str) -> Result<i32, DecodeError> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i32>() {
        return Ok(v);
    }

    let value = parse_float(trimmed)?.trunc();
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(DecodeError::OutOfRange(trimmed.to_owned()));
    }
    Ok(value as i32)
}
