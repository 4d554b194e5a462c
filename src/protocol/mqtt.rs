// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection backed by `rumqttc`.
//!
//! A connection is split into three parts:
//!
//! - [`MqttClient`] publishes and subscribes; it is what the bridge holds.
//! - [`ConnectionDriver`] polls the `rumqttc` event loop. It must be awaited
//!   alongside the bridge, otherwise nothing is sent or received.
//! - a receiver of [`BrokerEvent`]s carrying inbound messages and
//!   connectivity changes.
//!
//! # Examples
//!
//! ```no_run
//! use inetbox_bridge::protocol::MqttConnection;
//!
//! let connection = MqttConnection::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .last_will("service/truma/control_status/alive", "OFF")
//!     .build()?;
//! let (client, driver, events) = connection.into_parts();
//! # Ok::<(), inetbox_bridge::error::TransportError>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use super::{BrokerClient, BrokerEvent, EVENT_CHANNEL_CAPACITY};
use crate::error::TransportError;

/// Capacity of the outgoing request queue between client and event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
struct MqttConnectionConfig {
    host: String,
    port: u16,
    client_id: Option<String>,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    reconnect_delay: Duration,
    last_will: Option<(String, String)>,
}

impl Default for MqttConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: None,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            last_will: None,
        }
    }
}

/// A configured, not yet polled, broker connection.
pub struct MqttConnection {
    client: MqttClient,
    driver: ConnectionDriver,
    events: mpsc::Receiver<BrokerEvent>,
}

impl MqttConnection {
    /// Creates a new builder for configuring a broker connection.
    #[must_use]
    pub fn builder() -> MqttConnectionBuilder {
        MqttConnectionBuilder::default()
    }

    /// Splits the connection into client, driver and event receiver.
    #[must_use]
    pub fn into_parts(self) -> (MqttClient, ConnectionDriver, mpsc::Receiver<BrokerEvent>) {
        (self.client, self.driver, self.events)
    }
}

impl std::fmt::Debug for MqttConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConnection")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Publishing half of a broker connection.
///
/// Cheaply cloneable; all clones share the same session.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttClient {
    /// Returns whether the broker connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MqttClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttClient")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl BrokerClient for MqttClient {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        // Queued requests would block once the request channel fills up.
        if !self.is_connected() {
            return Err(TransportError::ConnectionFailed(
                "not connected to broker".to_string(),
            ));
        }
        tracing::trace!(topic = %topic, payload = %payload, "Publishing");
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(TransportError::Mqtt)
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(TransportError::Mqtt)?;
        tracing::debug!(filter = %filter, "Subscribed");
        Ok(())
    }
}

/// Polls the `rumqttc` event loop and forwards what arrives.
pub struct ConnectionDriver {
    event_loop: EventLoop,
    events: mpsc::Sender<BrokerEvent>,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
}

impl ConnectionDriver {
    /// Runs the event loop until the event receiver is dropped.
    ///
    /// Connection errors are logged and retried after the reconnect delay;
    /// `rumqttc` reconnects on the next poll.
    pub async fn run(mut self) {
        loop {
            let event = match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    tracing::info!(code = ?connack.code, "Connected to MQTT broker");
                    self.connected.store(true, Ordering::Release);
                    Some(BrokerEvent::Connected)
                }
                Ok(Event::Incoming(Packet::SubAck(suback))) => {
                    tracing::debug!(pkid = suback.pkid, "Subscription acknowledged");
                    None
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match String::from_utf8(publish.payload.to_vec()) {
                        Ok(payload) => {
                            tracing::debug!(
                                topic = %publish.topic,
                                payload = %payload,
                                "MQTT message received"
                            );
                            Some(BrokerEvent::Message {
                                topic: publish.topic,
                                payload,
                            })
                        }
                        Err(_) => {
                            tracing::debug!(topic = %publish.topic, "Ignoring non UTF-8 payload");
                            None
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::info!("MQTT broker disconnected");
                    self.mark_disconnected()
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "MQTT connection error"
                    );
                    let event = self.mark_disconnected();
                    if !self.forward(event) {
                        return;
                    }
                    tokio::time::sleep(self.reconnect_delay).await;
                    continue;
                }
            };

            if !self.forward(event) {
                return;
            }
        }
    }

    fn mark_disconnected(&self) -> Option<BrokerEvent> {
        self.connected
            .swap(false, Ordering::AcqRel)
            .then_some(BrokerEvent::Disconnected)
    }

    /// Hands an event to the bridge. Returns `false` once nobody listens.
    fn forward(&self, event: Option<BrokerEvent>) -> bool {
        let Some(event) = event else {
            return true;
        };
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(event = ?dropped, "Inbound queue full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Event receiver dropped, stopping MQTT driver");
                false
            }
        }
    }
}

impl std::fmt::Debug for ConnectionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDriver")
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}

/// Builder for an MQTT broker connection.
#[derive(Debug, Default)]
pub struct MqttConnectionBuilder {
    config: MqttConnectionConfig,
}

impl MqttConnectionBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the MQTT client identifier.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the delay between reconnection attempts (default: 5 seconds).
    #[must_use]
    pub fn reconnect_delay(mut self, duration: Duration) -> Self {
        self.config.reconnect_delay = duration;
        self
    }

    /// Sets the last-will message, published retained at QoS 0.
    #[must_use]
    pub fn last_will(mut self, topic: impl Into<String>, payload: impl Into<String>) -> Self {
        self.config.last_will = Some((topic.into(), payload.into()));
        self
    }

    /// Builds the connection without contacting the broker.
    ///
    /// The connection is established once the returned driver is polled.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if no host is set.
    pub fn build(self) -> Result<MqttConnection, TransportError> {
        let config = self.config;
        if config.host.is_empty() {
            return Err(TransportError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = config
            .client_id
            .unwrap_or_else(|| format!("inetbox_{}", std::process::id()));

        let mut options = MqttOptions::new(&client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);

        if let Some((ref username, ref password)) = config.credentials {
            options.set_credentials(username, password);
        }
        if let Some((topic, payload)) = config.last_will {
            options.set_last_will(LastWill::new(topic, payload, QoS::AtMostOnce, true));
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        tracing::debug!(
            host = %config.host,
            port = config.port,
            client_id = %client_id,
            "MQTT connection configured"
        );

        Ok(MqttConnection {
            client: MqttClient {
                client,
                connected: Arc::clone(&connected),
            },
            driver: ConnectionDriver {
                event_loop,
                events: events_tx,
                connected,
                reconnect_delay: config.reconnect_delay,
            },
            events: events_rx,
        })
    }
}
