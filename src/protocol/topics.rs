// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout of the bridge.
//!
//! ```text
//! service/truma/set/<key>                   → inbound commands
//! homeassistant/status                      → Home Assistant liveness
//! service/truma/control_status/<key>        → outbound heater/relay status
//! service/spiritlevel/status/<key>          → outbound inclination status
//! homeassistant/<component>/<node>/<id>/config → discovery entries
//! ```

use crate::config::TopicsConfig;

/// Resolved topic prefixes used by every bridge component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    command_prefix: String,
    status_prefix: String,
    inclination_prefix: String,
    liveness: String,
    discovery_prefix: String,
}

impl Topics {
    /// Creates the topic layout from configuration.
    ///
    /// Trailing slashes on prefixes are ignored.
    #[must_use]
    pub fn new(config: &TopicsConfig) -> Self {
        let trim = |s: &str| s.trim_end_matches('/').to_string();
        Self {
            command_prefix: trim(&config.command_prefix),
            status_prefix: trim(&config.status_prefix),
            inclination_prefix: trim(&config.inclination_prefix),
            liveness: config.liveness_topic.clone(),
            discovery_prefix: trim(&config.discovery_prefix),
        }
    }

    /// Subscription filter matching every command topic.
    #[must_use]
    pub fn command_filter(&self) -> String {
        format!("{}/#", self.command_prefix)
    }

    /// Command topic for `key`.
    #[must_use]
    pub fn command(&self, key: &str) -> String {
        format!("{}/{key}", self.command_prefix)
    }

    /// Strips the command prefix, returning the bare key.
    ///
    /// Returns `None` if `topic` is not a command topic.
    #[must_use]
    pub fn command_key<'t>(&self, topic: &'t str) -> Option<&'t str> {
        topic
            .strip_prefix(self.command_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }

    /// Status topic for `key` under the heater/relay prefix.
    #[must_use]
    pub fn status(&self, key: &str) -> String {
        format!("{}/{key}", self.status_prefix)
    }

    /// Status topic for `key` under the inclination prefix.
    #[must_use]
    pub fn inclination(&self, key: &str) -> String {
        format!("{}/{key}", self.inclination_prefix)
    }

    /// Home Assistant liveness topic.
    #[must_use]
    pub fn liveness(&self) -> &str {
        &self.liveness
    }

    /// Discovery config topic for one entity.
    #[must_use]
    pub fn discovery(&self, component: &str, node_id: &str, object_id: &str) -> String {
        format!(
            "{}/{component}/{node_id}/{object_id}/config",
            self.discovery_prefix
        )
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(&TopicsConfig::default())
    }
}
