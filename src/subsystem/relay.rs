// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gas bottle relay board.

use super::AuxiliaryDevice;
use crate::discovery::{Component, DeviceInfo, DiscoveryEntry, Entity};
use crate::error::StatusError;
use crate::hardware::{RELAY_CHANNELS, RelayBoard};
use crate::protocol::Topics;
use crate::status::{Accepts, DevicePoll, PollState, StatusOwner, StatusSnapshot, StatusTable};
use crate::types::{StatusKey, StatusValue};

const INPUTS: [(&str, &str); RELAY_CHANNELS] = [
    ("duo_ctrl_gas_green", "TRUMA DuoControl Gas Green"),
    ("duo_ctrl_gas_red", "TRUMA DuoControl Gas Red"),
];

const OUTPUTS: [(&str, &str); RELAY_CHANNELS] = [
    ("duo_ctrl_i", "TRUMA DuoControl Bottle I"),
    ("duo_ctrl_ii", "TRUMA DuoControl Bottle II"),
];

const SWITCH_OPTIONS: &[&str] = &["OFF", "ON"];

/// Relay board subsystem: two bottle-state inputs and two switch outputs.
pub struct DuoControl {
    board: Box<dyn RelayBoard>,
    table: StatusTable,
    dirty: bool,
}

impl DuoControl {
    /// Creates the subsystem over a relay board driver.
    ///
    /// Outputs are driven low on the first poll.
    #[must_use]
    pub fn new(board: Box<dyn RelayBoard>) -> Self {
        let mut table = StatusTable::new();
        for (key, _) in INPUTS {
            table = table.with_entry(key, StatusValue::Bool(false), Accepts::ReadOnly);
        }
        for (key, _) in OUTPUTS {
            table = table.with_entry(key, StatusValue::Bool(false), Accepts::Switch);
        }
        Self {
            board,
            table,
            dirty: true,
        }
    }

    fn outputs(&self) -> [bool; RELAY_CHANNELS] {
        OUTPUTS.map(|(key, _)| {
            self.table
                .get(key)
                .and_then(StatusValue::as_bool)
                .unwrap_or(false)
        })
    }
}

impl std::fmt::Debug for DuoControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuoControl")
            .field("table", &self.table)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl StatusOwner for DuoControl {
    fn owns(&self, key: &str) -> bool {
        self.table.contains(key)
    }

    fn keys(&self) -> Vec<StatusKey> {
        self.table.keys().cloned().collect()
    }

    fn get_all(&mut self) -> StatusSnapshot {
        self.table.snapshot()
    }

    fn set_status(&mut self, key: &str, payload: &str) -> Result<(), StatusError> {
        let value = self.table.validate(key, payload)?;
        if self.table.set(key, value) {
            self.dirty = true;
        }
        Ok(())
    }
}

impl DevicePoll for DuoControl {
    fn poll(&mut self) -> PollState {
        match self.board.read_inputs() {
            Ok(inputs) => {
                for ((key, _), level) in INPUTS.iter().zip(inputs) {
                    if self.table.set(key, StatusValue::Bool(level)) {
                        tracing::debug!(key, level, "Relay input changed");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Relay inputs unavailable"),
        }

        if self.dirty {
            let outputs = self.outputs();
            match self.board.write_outputs(outputs) {
                Ok(()) => {
                    tracing::debug!(?outputs, "Relay outputs driven");
                    self.dirty = false;
                }
                Err(e) => tracing::warn!(error = %e, "Relay outputs not driven"),
            }
        }
        PollState::Idle
    }
}

impl AuxiliaryDevice for DuoControl {
    fn discovery_entries(&self, topics: &Topics, device: &DeviceInfo) -> Vec<DiscoveryEntry> {
        let inputs = INPUTS.iter().map(|(key, name)| {
            Entity::new(Component::BinarySensor, *key, format!("truma_{key}"), *name)
                .state_topic(topics.status(key))
                .into_entry(device, topics)
        });
        let outputs = OUTPUTS.iter().map(|(key, name)| {
            Entity::new(Component::Select, *key, format!("truma_set_{key}"), *name)
                .state_topic(topics.status(key))
                .command_topic(topics.command(key))
                .options(SWITCH_OPTIONS)
                .into_entry(device, topics)
        });
        inputs.chain(outputs).collect()
    }
}
