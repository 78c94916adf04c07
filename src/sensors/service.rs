use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    broker::topics::Topics,
    fusion::{models::BroadcastSnapshot, FusionState},
};

/// Inbound message handler: routes a topic to its field, decodes the payload,
/// and hands the value to the fusion state, which broadcasts the result.
#[derive(Clone)]
pub struct SensorService {
    topics: Topics,
    fusion: FusionState,
}

impl SensorService {
    pub fn new(topics: Topics, fusion: FusionState) -> Self {
        Self { topics, fusion }
    }

    /// Returns the snapshot that was broadcast, or `None` when the message
    /// was dropped (unknown topic or undecodable payload). A dropped message
    /// leaves the fused reading untouched.
    pub async fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
        received_at: DateTime<Utc>,
    ) -> Option<BroadcastSnapshot> {
        let Some(sensor) = self.topics.route(topic) else {
            debug!(topic = %topic, "Message on unknown topic; ignoring");
            return None;
        };

        let measurement = match sensor.decode(payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    topic = %topic,
                    payload = %String::from_utf8_lossy(payload),
                    error = %e,
                    "Failed to decode sensor payload; field left unchanged"
                );
                return None;
            }
        };

        debug!(topic = %topic, measurement = ?measurement, "Sensor message received");
        Some(self.fusion.apply(measurement, received_at).await)
    }
}
