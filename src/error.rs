// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Failures are grouped by where they originate: broker transport, subsystem
//! status tables, hardware drivers and configuration loading. None of them is
//! ever reported back to the broker; callers log and continue.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking to the MQTT broker.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to broker communication.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The MQTT client rejected a request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors raised by a subsystem status table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The key does not exist in this table.
    #[error("unknown status key: {0}")]
    UnknownKey(String),

    /// The key exists but cannot be set remotely.
    #[error("status key {0} is read-only")]
    ReadOnly(String),

    /// The value is not accepted for this key.
    #[error("invalid value {value:?} for {key}, expected {expected}")]
    InvalidValue {
        /// The key that was addressed.
        key: String,
        /// The rejected value.
        value: String,
        /// Human readable description of the accepted values.
        expected: String,
    },
}

/// Errors related to auxiliary hardware.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// The platform has no driver for the requested feature.
    #[error("platform {platform} does not support {feature}")]
    Unsupported {
        /// Platform identifier from the configuration.
        platform: String,
        /// The feature that was requested.
        feature: String,
    },

    /// The driver could not read from the device.
    #[error("read failed: {0}")]
    Read(String),

    /// The driver could not write to the device.
    #[error("write failed: {0}")]
    Write(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// File I/O failure.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
