// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater panel application state.
//!
//! [`HeaterPanel`] holds the status table of the heater as seen on the panel
//! bus. Values written from the broker are validated, then queued as
//! outbound updates; one update goes out per [`DevicePoll::poll`] call.
//! Readings decoded from the bus arrive through [`HeaterPanel::apply_reading`].

use std::collections::VecDeque;

use super::PrimaryDevice;
use crate::discovery::{EL_POWER_LEVELS, ENERGY_MIXES, HEATING_MODES, WATER_TEMP_OPTIONS};
use crate::error::StatusError;
use crate::logging::{INET_TARGET, LIN_TARGET};
use crate::status::{Accepts, DevicePoll, PollState, StatusOwner, StatusSnapshot, StatusTable};
use crate::types::{StatusKey, StatusValue};

const ROOM_TEMP: Accepts = Accepts::Range {
    min: 5.0,
    max: 30.0,
    off: Some(0.0),
};

/// The heater panel subsystem.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::status::{DevicePoll, PollState, StatusOwner};
/// use inetbox_bridge::subsystem::HeaterPanel;
///
/// let mut heater = HeaterPanel::new();
/// heater.set_status("heating_mode", "eco").unwrap();
/// assert!(heater.has_pending());
///
/// assert_eq!(heater.poll(), PollState::Idle);
/// assert!(!heater.has_pending());
/// ```
#[derive(Debug, Clone)]
pub struct HeaterPanel {
    table: StatusTable,
    outbound: VecDeque<(StatusKey, StatusValue)>,
}

impl HeaterPanel {
    /// Creates a panel with the heater switched off.
    #[must_use]
    pub fn new() -> Self {
        let table = StatusTable::new()
            .with_entry(StatusKey::HEARTBEAT, StatusValue::Bool(false), Accepts::ReadOnly)
            .with_entry("current_temp_room", StatusValue::Number(0.0), Accepts::ReadOnly)
            .with_entry("current_temp_water", StatusValue::Number(0.0), Accepts::ReadOnly)
            .with_entry("target_temp_room", StatusValue::Number(0.0), ROOM_TEMP)
            .with_entry(
                "target_temp_water",
                StatusValue::Number(0.0),
                Accepts::OneOf(WATER_TEMP_OPTIONS),
            )
            .with_entry("heating_mode", StatusValue::text("off"), Accepts::OneOf(HEATING_MODES))
            .with_entry("energy_mix", StatusValue::text("none"), Accepts::OneOf(ENERGY_MIXES))
            .with_entry(
                "el_power_level",
                StatusValue::Number(0.0),
                Accepts::OneOf(EL_POWER_LEVELS),
            )
            .with_entry("operating_status", StatusValue::text("off"), Accepts::ReadOnly)
            .with_entry("error_code", StatusValue::Number(0.0), Accepts::ReadOnly)
            .with_entry("clock", StatusValue::text("00:00"), Accepts::ReadOnly);

        Self {
            table,
            outbound: VecDeque::new(),
        }
    }

    /// Stores a value decoded from the panel bus.
    ///
    /// Unknown keys are ignored.
    pub fn apply_reading(&mut self, key: &str, value: StatusValue) {
        if self.table.set(key, value) {
            tracing::debug!(target: INET_TARGET, key, value = ?self.table.get(key), "Heater reading changed");
        }
    }

    /// Returns the current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.table.get(key)
    }

    /// Returns whether outbound updates are waiting for the bus.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.outbound.is_empty()
    }
}

impl Default for HeaterPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusOwner for HeaterPanel {
    fn owns(&self, key: &str) -> bool {
        self.table.contains(key)
    }

    fn keys(&self) -> Vec<StatusKey> {
        self.table.keys().cloned().collect()
    }

    fn get_all(&mut self) -> StatusSnapshot {
        let snapshot = self.table.snapshot();
        self.table.set(StatusKey::HEARTBEAT, StatusValue::Bool(false));
        snapshot
    }

    fn set_status(&mut self, key: &str, payload: &str) -> Result<(), StatusError> {
        let value = self.table.validate(key, payload)?;
        tracing::debug!(target: INET_TARGET, key, %value, "Heater update queued");
        // A newer write for the same key supersedes the queued one.
        self.outbound.retain(|(queued, _)| queued.as_str() != key);
        self.outbound.push_back((StatusKey::new(key), value));
        Ok(())
    }
}

impl DevicePoll for HeaterPanel {
    fn poll(&mut self) -> PollState {
        if let Some((key, value)) = self.outbound.pop_front() {
            tracing::debug!(target: LIN_TARGET, key = %key, %value, "Frame sent to panel");
            self.table.set(key.as_str(), value);
        }
        if self.outbound.is_empty() {
            PollState::Idle
        } else {
            PollState::Busy
        }
    }
}

impl PrimaryDevice for HeaterPanel {
    fn mark_alive(&mut self) {
        self.table.set(StatusKey::HEARTBEAT, StatusValue::Bool(true));
    }
}
