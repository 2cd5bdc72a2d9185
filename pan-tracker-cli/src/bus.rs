//! Message bus input
//!
//! Subscribes to the tracked-subject and target-id topics on the MQTT broker
//! and decodes their MessagePack payloads. Undecodable payloads are rejected
//! here, at the boundary, and never reach the control loop.

use crate::config::BusConfig;
use pan_tracker_core::{SubjectId, TrackedBatch, TrackerError};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;

/// Pause before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Tracking(TrackedBatch),
    Target(SubjectId),
}

/// Topic filters for the two inputs
#[derive(Debug, Clone)]
pub struct Topics {
    pub tracking: String,
    pub target: String,
}

impl Topics {
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            tracking: config.tracking_topic.clone(),
            target: config.target_topic.clone(),
        }
    }

    /// Decode a publish on `topic`
    ///
    /// Returns `Ok(None)` for topics that match neither input.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Option<BusMessage>, TrackerError> {
        if topic_matches(&self.tracking, topic) {
            let batch: TrackedBatch = rmp_serde::from_slice(payload)
                .map_err(|e| TrackerError::invalid_payload(topic, e))?;
            Ok(Some(BusMessage::Tracking(batch)))
        } else if topic_matches(&self.target, topic) {
            let id: SubjectId = rmp_serde::from_slice(payload)
                .map_err(|e| TrackerError::invalid_payload(topic, e))?;
            Ok(Some(BusMessage::Target(id)))
        } else {
            Ok(None)
        }
    }
}

/// MQTT topic filter matching with `+` and `#` wildcards
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// MQTT client id: the application name as prefix of the configured id
pub fn client_id(config: &BusConfig, app_name: &str) -> String {
    if app_name.is_empty() {
        config.client_id.clone()
    } else {
        format!("{}-{}", app_name, config.client_id)
    }
}

fn mqtt_options(config: &BusConfig, app_name: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id(config, app_name), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(10));
    if let Some(username) = &config.username {
        options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
    }
    options
}

/// Bus task body
///
/// Runs for the life of the process. Subscriptions are (re)issued on every
/// CONNACK so a broker restart does not silently drop the inputs.
pub async fn run(config: BusConfig, app_name: String, messages: mpsc::UnboundedSender<BusMessage>) {
    let topics = Topics::from_config(&config);
    let (client, mut eventloop) = AsyncClient::new(mqtt_options(&config, &app_name), 16);

    log::info!("Connecting to broker at {}:{}", config.host, config.port);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                log::info!("Connected to broker; subscribing to {:?} and {:?}", topics.tracking, topics.target);
                for filter in [&topics.tracking, &topics.target] {
                    if let Err(e) = client.try_subscribe(filter.as_str(), QoS::AtMostOnce) {
                        log::error!("Subscribe to {:?} failed: {}", filter, e);
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match topics.decode(&publish.topic, &publish.payload) {
                    Ok(Some(message)) => {
                        if messages.send(message).is_err() {
                            log::debug!("Control loop gone, bus task exiting");
                            return;
                        }
                    }
                    Ok(None) => log::trace!("Ignoring message on {}", publish.topic),
                    Err(e) => log::warn!("{}", e),
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Broker connection error: {} (retrying in {}s)", e, RECONNECT_DELAY.as_secs());
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
