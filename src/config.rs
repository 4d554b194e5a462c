// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `inetbox.toml` in the working directory, or the file named by
//! `INETBOX_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "inetbox.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Topic prefixes.
    pub topics: TopicsConfig,
    /// Log channel settings.
    pub logging: LoggingConfig,
    /// Device identity and platform.
    pub device: DeviceConfig,
    /// Optional auxiliary subsystems.
    pub features: FeaturesConfig,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Optional username.
    pub username: Option<String>,
    /// Optional password, used only together with a username.
    pub password: Option<String>,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Seconds to wait for the first connection before warning.
    pub connection_timeout_secs: u64,
    /// Seconds between reconnection attempts.
    pub reconnect_delay_secs: u64,
}

/// Topic prefixes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Prefix of inbound command topics.
    pub command_prefix: String,
    /// Prefix of heater and relay status topics.
    pub status_prefix: String,
    /// Prefix of inclination status topics.
    pub inclination_prefix: String,
    /// Home Assistant liveness topic.
    pub liveness_topic: String,
    /// Home Assistant discovery prefix.
    pub discovery_prefix: String,
}

/// Log channel settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Debug output for the heater bus frames.
    pub lin_debug: bool,
    /// Debug output for the heater application state.
    pub inet_debug: bool,
    /// Debug output for the bridge and broker traffic.
    pub mqtt_debug: bool,
    /// Write logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Raw filter directive (`RUST_LOG` syntax), overrides the flags.
    pub filter: Option<String>,
}

/// Device identity and platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Hardware platform identifier selecting the auxiliary drivers.
    pub platform: String,
    /// Model reported in discovery entries.
    pub model: String,
    /// Software version reported in discovery entries.
    pub sw_version: String,
    /// Release published on the `release` status topic.
    pub release: String,
    /// Node id used in discovery topics.
    pub node_id: String,
    /// File the run mode is persisted to before a reset.
    pub run_mode_file: PathBuf,
}

/// Optional auxiliary subsystems.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Enable the relay-control board (gas bottle switch-over).
    pub relay_control: bool,
    /// Enable the inclination sensor.
    pub inclination: bool,
}

impl Config {
    /// Loads configuration from `INETBOX_CONFIG` or `inetbox.toml` (if
    /// present), then applies environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("INETBOX_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("INETBOX_MQTT_HOST") {
            self.mqtt.host = val;
        }
        if let Ok(val) = std::env::var("INETBOX_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.port = port;
        }
        if let Ok(val) = std::env::var("INETBOX_MQTT_USER") {
            self.mqtt.username = Some(val);
        }
        if let Ok(val) = std::env::var("INETBOX_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Ok(val) = std::env::var("INETBOX_PLATFORM") {
            self.device.platform = val;
        }
        if let Ok(val) = std::env::var("INETBOX_RELAY_CONTROL") {
            self.features.relay_control = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("INETBOX_INCLINATION") {
            self.features.inclination = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("INETBOX_LOG") {
            self.logging.filter = Some(val);
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = Some(val);
        }
    }

    /// Checks semantic constraints the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Validation("mqtt.host must be set".to_string()));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation(
                "mqtt.port must be non-zero".to_string(),
            ));
        }
        if self.mqtt.connection_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "mqtt.connection_timeout_secs must be non-zero".to_string(),
            ));
        }
        let prefixes = [
            ("topics.command_prefix", &self.topics.command_prefix),
            ("topics.status_prefix", &self.topics.status_prefix),
            ("topics.inclination_prefix", &self.topics.inclination_prefix),
            ("topics.liveness_topic", &self.topics.liveness_topic),
            ("topics.discovery_prefix", &self.topics.discovery_prefix),
        ];
        for (name, value) in prefixes {
            if value.trim_end_matches('/').is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
            if value.contains(['#', '+']) {
                return Err(ConfigError::Validation(format!(
                    "{name} must not contain MQTT wildcards"
                )));
            }
        }
        Ok(())
    }

    /// Returns the broker credentials if a username is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.mqtt
            .username
            .as_deref()
            .filter(|user| !user.is_empty())
            .map(|user| (user, self.mqtt.password.as_deref().unwrap_or_default()))
    }
}

/// Interprets the `"1"`/`"true"` style flags stored by the configuration portal.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "inetbox_bridge".to_string(),
            keep_alive_secs: 30,
            connection_timeout_secs: 10,
            reconnect_delay_secs: 5,
        }
    }
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            command_prefix: "service/truma/set".to_string(),
            status_prefix: "service/truma/control_status".to_string(),
            inclination_prefix: "service/spiritlevel/status".to_string(),
            liveness_topic: "homeassistant/status".to_string(),
            discovery_prefix: "homeassistant".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            platform: "sim".to_string(),
            model: "inetbox".to_string(),
            sw_version: "V03".to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            node_id: "truma".to_string(),
            run_mode_file: PathBuf::from("run_mode"),
        }
    }
}
