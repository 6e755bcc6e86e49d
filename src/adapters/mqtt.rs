//! MQTT adapter.
//!
//! Topic layout, keyed by the client id:
//!
//! | Topic              | Direction | Payload                         |
//! |--------------------|-----------|---------------------------------|
//! | `conf/<id>`        | in        | config payload                  |
//! | `cmnd/<id>`        | in        | command payload                 |
//! | `stat/<id>`        | out       | output / input events           |
//! | `stat/<id>/adopt`  | out       | adoption description            |
//! | `log/<id>`         | out       | free-text log lines             |
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`MqttPublisher`] wraps `EspMqttClient`;
//!   a connection thread forwards every broker event over a channel.
//! - **all targets**: topic layout and inbound routing, pure and tested.

use core::fmt::Write;

#[cfg(target_os = "espidf")]
use log::{info, warn};

pub type Topic = heapless::String<48>;

/// What an inbound message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    Config,
    Command,
}

/// Broker events forwarded from the connection thread to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttMessage {
    Connected,
    Disconnected,
    Received { topic: String, payload: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub config: Topic,
    pub command: Topic,
    pub status: Topic,
    pub adopt: Topic,
    pub log: Topic,
}

impl Topics {
    pub fn new(client_id: &str) -> Self {
        let topic = |prefix: &str, suffix: &str| {
            let mut t = Topic::new();
            let _ = write!(t, "{}/{}{}", prefix, client_id, suffix);
            t
        };
        Self {
            config: topic("conf", ""),
            command: topic("cmnd", ""),
            status: topic("stat", ""),
            adopt: topic("stat", "/adopt"),
            log: topic("log", ""),
        }
    }

    /// Route an inbound topic.  `None` for anything we did not subscribe to.
    pub fn classify(&self, topic: &str) -> Option<InboundKind> {
        if topic == self.config.as_str() {
            Some(InboundKind::Config)
        } else if topic == self.command.as_str() {
            Some(InboundKind::Command)
        } else {
            None
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttPublisher {
    client: esp_idf_svc::mqtt::client::EspMqttClient<'static>,
    topics: Topics,
}

#[cfg(target_os = "espidf")]
impl MqttPublisher {
    /// Create the client and spawn the connection thread.  Broker events
    /// arrive on the returned receiver; nothing is subscribed until
    /// [`subscribe`](Self::subscribe) is called after `Connected`.
    pub fn connect(
        url: &str,
        client_id: &str,
    ) -> Result<(Self, std::sync::mpsc::Receiver<MqttMessage>), esp_idf_svc::sys::EspError> {
        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let (client, mut connection) = EspMqttClient::new(url, &conf)?;
        let (tx, rx) = std::sync::mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("mqtt-conn".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    let msg = match event.payload() {
                        EventPayload::Connected(_) => MqttMessage::Connected,
                        EventPayload::Disconnected => MqttMessage::Disconnected,
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            ..
                        } => MqttMessage::Received {
                            topic: topic.into(),
                            payload: data.to_vec(),
                        },
                        _ => continue,
                    };
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                info!("MQTT: connection thread exiting");
            });
        if let Err(e) = spawned {
            warn!("MQTT: could not spawn connection thread: {}", e);
            return Err(esp_idf_svc::sys::EspError::from_infallible::<
                { esp_idf_svc::sys::ESP_ERR_NO_MEM },
            >());
        }

        info!("MQTT: client '{}' -> {}", client_id, url);
        Ok((
            Self {
                client,
                topics: Topics::new(client_id),
            },
            rx,
        ))
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn subscribe(&mut self) {
        use esp_idf_svc::mqtt::client::QoS;
        for topic in [&self.topics.config, &self.topics.command] {
            if let Err(e) = self.client.subscribe(topic, QoS::AtLeastOnce) {
                warn!("MQTT: subscribe {} failed: {}", topic, e);
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        use esp_idf_svc::mqtt::client::QoS;
        self.client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .is_ok()
    }
}

#[cfg(target_os = "espidf")]
impl crate::app::ports::StatusPublisher for MqttPublisher {
    fn publish_status(&mut self, payload: &str) -> bool {
        let topic = self.topics.status.clone();
        self.publish(&topic, payload)
    }

    fn publish_adopt(&mut self, payload: &str) -> bool {
        let topic = self.topics.adopt.clone();
        self.publish(&topic, payload)
    }

    fn publish_log(&mut self, line: &str) -> bool {
        let topic = self.topics.log.clone();
        self.publish(&topic, line)
    }
}
