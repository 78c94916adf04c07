pub mod service;

pub use service::{ControlService, InvalidCommand, LedCommand};
