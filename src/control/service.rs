use std::{fmt, str::FromStr, sync::Arc};

use thiserror::Error;
use tracing::{error, info};

use crate::broker::{BrokerError, CommandPublisher};

// ---------------------------------------------------------------------------
// LedCommand
// ---------------------------------------------------------------------------

/// The only payloads accepted on the actuator command topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid command. Use \"ON\" or \"OFF\".")]
pub struct InvalidCommand;

impl LedCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            LedCommand::On => "ON",
            LedCommand::Off => "OFF",
        }
    }
}

impl FromStr for LedCommand {
    type Err = InvalidCommand;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(InvalidCommand),
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ControlService
// ---------------------------------------------------------------------------

/// Dispatches actuator commands onto the broker. One call, one publish;
/// failures are reported to the caller and never retried.
#[derive(Clone)]
pub struct ControlService {
    publisher: Arc<dyn CommandPublisher>,
    topic: String,
}

impl ControlService {
    pub fn new(publisher: Arc<dyn CommandPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    pub async fn send(&self, command: LedCommand) -> Result<(), BrokerError> {
        match self.publisher.publish(&self.topic, command.as_str()).await {
            Ok(()) => {
                info!(topic = %self.topic, command = %command, "Published actuator command");
                Ok(())
            }
            Err(e) => {
                error!(topic = %self.topic, command = %command, error = %e, "Failed to publish actuator command");
                Err(e)
            }
        }
    }

    pub fn broker_connected(&self) -> bool {
        self.publisher.is_connected()
    }
}
