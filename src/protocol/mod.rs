// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker access for the bridge.
//!
//! The bridge only needs two operations from a broker session: publish and
//! subscribe. They are captured by [`BrokerClient`] so the orchestration
//! code can run against the real [`MqttConnection`] or a test double.
//!
//! Inbound traffic and connectivity changes arrive as [`BrokerEvent`]s on a
//! channel fed by the connection driver.

#[cfg(feature = "mqtt")]
mod mqtt;
mod topics;

#[cfg(feature = "mqtt")]
pub use mqtt::{ConnectionDriver, MqttClient, MqttConnection, MqttConnectionBuilder};
pub use topics::Topics;

use crate::error::TransportError;

/// Capacity of the inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Minimal broker session used by the bridge.
///
/// All publishes are QoS 1 and not retained.
#[allow(async_fn_in_trait)]
pub trait BrokerClient {
    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request cannot be queued.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Subscribes to `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request cannot be queued.
    async fn subscribe(&self, filter: &str) -> Result<(), TransportError>;
}

/// Something that happened on the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// The broker acknowledged a (re)connection.
    Connected,
    /// The connection was lost; the driver keeps retrying.
    Disconnected,
    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message was published to.
        topic: String,
        /// UTF-8 payload.
        payload: String,
    },
}

impl BrokerEvent {
    /// Creates a message event.
    #[must_use]
    pub fn message(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Message {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
