pub mod topics;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter};
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::{config::BrokerConfig, sensors::SensorService};

use self::topics::Topics;

/// Capacity of the request queue between client handles and the event loop.
const REQUEST_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker is not connected")]
    Disconnected,
    #[error("MQTT client request failed: {0}")]
    Client(#[from] ClientError),
}

/// Outbound side of the broker link, used by the command path.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;
}

/// Persistent MQTT connection shared by the inbound loop and the command path.
#[derive(Clone)]
pub struct BrokerLink {
    client: AsyncClient,
    topics: Topics,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
}

impl BrokerLink {
    /// Build the client handle and the event loop that drives it. Nothing
    /// touches the network until the loop is polled by [`BrokerLink::run`].
    pub fn new(config: &BrokerConfig, topics: Topics) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let link = Self {
            client,
            topics,
            connected: Arc::new(AtomicBool::new(false)),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        };
        (link, eventloop)
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Drives the connection for the lifetime of the process.
    /// Spawn this via `tokio::spawn`.
    ///
    /// Every inbound publish is handed to `sensors` exactly once, in transport
    /// order. Transport errors are logged; the transport reconnects on the
    /// next poll.
    pub async fn run(self, mut eventloop: EventLoop, sensors: SensorService) {
        info!(topics = ?self.topics.inbound(), "Broker loop started");

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.connected.store(true, Ordering::SeqCst);
                    info!("Connected to MQTT broker");
                    self.subscribe_all();
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!(pkid = ack.pkid, return_codes = ?ack.return_codes, "Subscription acknowledged");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    sensors
                        .handle_message(&publish.topic, &publish.payload, Utc::now())
                        .await;
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("Broker sent disconnect");
                }
                Ok(_) => {}
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    error!(error = %e, "MQTT connection error");
                    time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    /// Queue one batch subscription without waiting on the event loop, which
    /// is the caller here.
    fn subscribe_all(&self) {
        let filters = self
            .topics
            .inbound()
            .into_iter()
            .map(|topic| SubscribeFilter::new(topic.to_owned(), QoS::AtMostOnce));

        match self.client.try_subscribe_many(filters) {
            Ok(()) => info!(topics = ?self.topics.inbound(), "Subscribed to sensor topics"),
            Err(e) => error!(error = %e, "Failed to subscribe to sensor topics"),
        }
    }
}

#[async_trait]
impl CommandPublisher for BrokerLink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::Disconnected);
        }

        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BrokerConfig {
        BrokerConfig {
            host: "localhost".into(),
            port: 1883,
            client_id: "test-client".into(),
            topic_prefix: "test".into(),
            keep_alive_secs: 30,
            reconnect_delay_secs: 1,
        }
    }

    #[tokio::test]
    async fn publish_fails_fast_before_connack() {
        let (link, _eventloop) = BrokerLink::new(&config(), Topics::with_prefix("test"));
        assert!(!link.is_connected());

        let err = link.publish("test/control_led", "ON").await.unwrap_err();
        assert!(matches!(err, BrokerError::Disconnected));
    }

    #[test]
    fn link_exposes_its_topics() {
        let (link, _eventloop) = BrokerLink::new(&config(), Topics::with_prefix("test"));
        assert_eq!(link.topics().led_command, "test/control_led");
    }
}
