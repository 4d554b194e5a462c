// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Log channel setup.
//!
//! The bridge has three independent debug channels, each mapped to a
//! `tracing` target:
//!
//! | flag         | target                  | content                      |
//! |--------------|-------------------------|------------------------------|
//! | `lin_debug`  | `inetbox_bridge::lin`   | frames sent to the panel     |
//! | `inet_debug` | `inetbox_bridge::inet`  | heater application state     |
//! | `mqtt_debug` | `inetbox_bridge`        | bridge and broker traffic    |

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::Error;

/// Target of the heater bus channel.
pub const LIN_TARGET: &str = "inetbox_bridge::lin";

/// Target of the heater application channel.
pub const INET_TARGET: &str = "inetbox_bridge::inet";

/// Builds the filter directive for the configured channels.
///
/// A raw `filter` in the configuration wins over the flags.
#[must_use]
pub fn filter_directive(config: &LoggingConfig) -> String {
    if let Some(filter) = config.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        return filter.to_string();
    }

    let level = |enabled: bool| if enabled { "debug" } else { "info" };
    format!(
        "info,inetbox_bridge={},{LIN_TARGET}={},{INET_TARGET}={}",
        level(config.mqtt_debug),
        level(config.lin_debug),
        level(config.inet_debug),
    )
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    let filter = EnvFilter::new(filter_directive(config));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    if config.lin_debug {
        tracing::info!("LIN log channel enabled");
    }
    if config.inet_debug {
        tracing::info!("INET log channel enabled");
    }
    if config.mqtt_debug {
        tracing::info!("MQTT log channel enabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_is_info_everywhere() {
        let directive = filter_directive(&LoggingConfig::default());
        assert_eq!(
            directive,
            "info,inetbox_bridge=info,inetbox_bridge::lin=info,inetbox_bridge::inet=info"
        );
    }

    #[test]
    fn flags_raise_their_channel_only() {
        let config = LoggingConfig {
            lin_debug: true,
            ..LoggingConfig::default()
        };
        let directive = filter_directive(&config);
        assert!(directive.contains("inetbox_bridge::lin=debug"));
        assert!(directive.contains("inetbox_bridge::inet=info"));
        assert!(directive.contains("inetbox_bridge=info"));
    }

    #[test]
    fn raw_filter_wins() {
        let config = LoggingConfig {
            mqtt_debug: true,
            filter: Some("trace".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directive(&config), "trace");
    }

    #[test]
    fn blank_raw_filter_is_ignored() {
        let config = LoggingConfig {
            filter: Some(" ".to_string()),
            ..LoggingConfig::default()
        };
        assert!(filter_directive(&config).starts_with("info,"));
    }

    #[test]
    fn directive_parses() {
        let config = LoggingConfig {
            inet_debug: true,
            ..LoggingConfig::default()
        };
        assert!(EnvFilter::try_new(filter_directive(&config)).is_ok());
    }
}
