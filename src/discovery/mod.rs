// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery.
//!
//! The bridge announces one Home Assistant entity per status key and per
//! settable option. The set of entities is the built-in heater table merged
//! with entries contributed by the auxiliary subsystems that are present at
//! startup; after that merge the [`DiscoveryRegistry`] never changes.
//!
//! # Resync
//!
//! [`DiscoveryRegistry::resync`] retracts every entity (empty payload), then
//! registers every entity again and finally publishes the release version.
//! It runs once at startup and again whenever Home Assistant announces
//! `online` on its liveness topic, so a restarted Home Assistant re-learns the
//! bridge without restarting the bridge.
//!
//! ```text
//! homeassistant/select/truma/heating_mode/config ← ""            (retract)
//! ...
//! homeassistant/select/truma/heating_mode/config ← {"name": ...} (register)
//! ...
//! service/truma/control_status/release           ← "1.0.0"
//! ```

mod builtin;

pub use builtin::{
    EL_POWER_LEVELS, ENERGY_MIXES, HEATING_MODES, ROOM_TEMP_OPTIONS, WATER_TEMP_OPTIONS,
    builtin_entries,
};

use serde_json::{Map, Value, json};

use crate::protocol::{BrokerClient, Topics};

/// Identity shared by every announced entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Model name.
    pub model: String,
    /// Software version.
    pub sw_version: String,
    /// Node id used in discovery topics.
    pub node_id: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: "inetbox".to_string(),
            sw_version: "V03".to_string(),
            node_id: "truma".to_string(),
        }
    }
}

/// Home Assistant entity platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Read-only value.
    Sensor,
    /// Read-only on/off value.
    BinarySensor,
    /// Value chosen from a list of options.
    Select,
}

impl Component {
    /// Returns the component name used in discovery topics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::BinarySensor => "binary_sensor",
            Self::Select => "select",
        }
    }
}

/// Description of one Home Assistant entity.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::discovery::{Component, DeviceInfo, Entity};
/// use inetbox_bridge::protocol::Topics;
///
/// let topics = Topics::default();
/// let entry = Entity::new(Component::Select, "heating_mode", "truma_set_heating_mode", "TRUMA Set Heating Mode")
///     .command_topic(topics.command("heating_mode"))
///     .options(&["off", "eco", "high"])
///     .into_entry(&DeviceInfo::default(), &topics);
///
/// assert_eq!(entry.topic(), "homeassistant/select/truma/heating_mode/config");
/// assert!(entry.payload().contains("\"command_topic\":\"service/truma/set/heating_mode\""));
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    component: Component,
    object_id: String,
    unique_id: String,
    name: String,
    state_topic: Option<String>,
    command_topic: Option<String>,
    options: Vec<String>,
    device_class: Option<String>,
    unit: Option<String>,
}

impl Entity {
    /// Creates an entity description.
    #[must_use]
    pub fn new(
        component: Component,
        object_id: impl Into<String>,
        unique_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            component,
            object_id: object_id.into(),
            unique_id: unique_id.into(),
            name: name.into(),
            state_topic: None,
            command_topic: None,
            options: Vec::new(),
            device_class: None,
            unit: None,
        }
    }

    /// Sets the topic the entity reads its state from.
    #[must_use]
    pub fn state_topic(mut self, topic: impl Into<String>) -> Self {
        self.state_topic = Some(topic.into());
        self
    }

    /// Sets the topic the entity sends commands to.
    #[must_use]
    pub fn command_topic(mut self, topic: impl Into<String>) -> Self {
        self.command_topic = Some(topic.into());
        self
    }

    /// Sets the accepted option values.
    #[must_use]
    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the Home Assistant device class.
    #[must_use]
    pub fn device_class(mut self, class: impl Into<String>) -> Self {
        self.device_class = Some(class.into());
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Renders the entity into its discovery topic and JSON payload.
    #[must_use]
    pub fn into_entry(self, device: &DeviceInfo, topics: &Topics) -> DiscoveryEntry {
        let mut payload = Map::new();
        payload.insert("name".to_string(), json!(self.name));
        payload.insert("unique_id".to_string(), json!(self.unique_id));
        payload.insert("model".to_string(), json!(device.model));
        payload.insert("sw_version".to_string(), json!(device.sw_version));

        let optional = [
            ("device_class", self.device_class),
            ("unit_of_measurement", self.unit),
            ("state_topic", self.state_topic),
            ("command_topic", self.command_topic),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                payload.insert(field.to_string(), Value::String(value));
            }
        }
        if !self.options.is_empty() {
            payload.insert("options".to_string(), json!(self.options));
        }

        DiscoveryEntry {
            topic: topics.discovery(self.component.as_str(), &device.node_id, &self.object_id),
            unique_id: self.unique_id,
            payload: Value::Object(payload).to_string(),
        }
    }
}

/// One rendered discovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEntry {
    topic: String,
    unique_id: String,
    payload: String,
}

impl DiscoveryEntry {
    /// Discovery config topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Unique id of the entity.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// JSON payload.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Outcome of one discovery resync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Entries successfully retracted.
    pub retracted: usize,
    /// Entries successfully registered.
    pub registered: usize,
    /// Publishes that failed, including the release publish.
    pub failed: usize,
}

impl ResyncReport {
    /// Returns whether every publish succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// The full, immutable set of discovery entries.
#[derive(Debug, Clone)]
pub struct DiscoveryRegistry {
    entries: Vec<DiscoveryEntry>,
    release_topic: String,
    release: String,
}

impl DiscoveryRegistry {
    /// Creates a registry from the built-in entries.
    ///
    /// `release` is published to `release_topic` at the end of every resync.
    #[must_use]
    pub fn new(
        builtin: Vec<DiscoveryEntry>,
        release_topic: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            entries: builtin,
            release_topic: release_topic.into(),
            release: release.into(),
        }
    }

    /// Merges entries contributed by an auxiliary subsystem.
    ///
    /// An entry whose unique id is already known replaces the existing one.
    #[must_use]
    pub fn with_entries(mut self, extra: Vec<DiscoveryEntry>) -> Self {
        for entry in extra {
            match self
                .entries
                .iter_mut()
                .find(|known| known.unique_id == entry.unique_id)
            {
                Some(known) => {
                    tracing::warn!(
                        unique_id = %entry.unique_id,
                        "Discovery entry replaced by auxiliary subsystem"
                    );
                    *known = entry;
                }
                None => self.entries.push(entry),
            }
        }
        self
    }

    /// Returns every entry in announcement order.
    #[must_use]
    pub fn entries(&self) -> &[DiscoveryEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retracts and re-registers every entity, then publishes the release.
    ///
    /// Every publish is attempted; failures are logged and counted.
    pub async fn resync<C: BrokerClient>(&self, client: &C) -> ResyncReport {
        tracing::info!(entities = self.entries.len(), "Resyncing Home Assistant discovery");
        let mut report = ResyncReport::default();

        for entry in &self.entries {
            match client.publish(&entry.topic, "").await {
                Ok(()) => report.retracted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(topic = %entry.topic, error = %e, "Discovery retraction failed");
                }
            }
        }

        for entry in &self.entries {
            match client.publish(&entry.topic, &entry.payload).await {
                Ok(()) => report.registered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(topic = %entry.topic, error = %e, "Discovery registration failed");
                }
            }
        }

        if let Err(e) = client.publish(&self.release_topic, &self.release).await {
            report.failed += 1;
            tracing::debug!(topic = %self.release_topic, error = %e, "Release publish failed");
        }

        if !report.is_complete() {
            tracing::warn!(failed = report.failed, "Discovery resync incomplete");
        }
        report
    }
}
