// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-axis spirit level.
//!
//! Roll and pitch are derived from the gravity vector, smoothed over the
//! last [`SpiritLevel::WINDOW`] samples and reported in degrees with one
//! decimal.

use std::collections::VecDeque;

use super::AuxiliaryDevice;
use crate::discovery::{Component, DeviceInfo, DiscoveryEntry, Entity};
use crate::error::StatusError;
use crate::hardware::{Acceleration, Accelerometer};
use crate::protocol::Topics;
use crate::status::{Accepts, DevicePoll, PollState, StatusOwner, StatusSnapshot, StatusTable};
use crate::types::{StatusKey, StatusValue};

const ANGLE_X: &str = "angle_x";
const ANGLE_Y: &str = "angle_y";

/// Inclination subsystem.
pub struct SpiritLevel {
    sensor: Box<dyn Accelerometer>,
    window: VecDeque<Acceleration>,
    table: StatusTable,
}

impl SpiritLevel {
    /// Number of samples averaged per reading.
    pub const WINDOW: usize = 10;

    /// Creates the subsystem over an accelerometer driver.
    #[must_use]
    pub fn new(sensor: Box<dyn Accelerometer>) -> Self {
        let table = StatusTable::new()
            .with_entry(ANGLE_X, StatusValue::Number(0.0), Accepts::ReadOnly)
            .with_entry(ANGLE_Y, StatusValue::Number(0.0), Accepts::ReadOnly);
        Self {
            sensor,
            window: VecDeque::with_capacity(Self::WINDOW),
            table,
        }
    }

    fn mean(&self) -> Option<Acceleration> {
        #[allow(clippy::cast_precision_loss)]
        let n = self.window.len() as f64;
        if n == 0.0 {
            return None;
        }
        let sum = self.window.iter().fold(
            Acceleration {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            |acc, s| Acceleration {
                x: acc.x + s.x,
                y: acc.y + s.y,
                z: acc.z + s.z,
            },
        );
        Some(Acceleration {
            x: sum.x / n,
            y: sum.y / n,
            z: sum.z / n,
        })
    }
}

/// Roll and pitch in degrees.
fn angles(a: Acceleration) -> (f64, f64) {
    let roll = a.y.atan2(a.z).to_degrees();
    let pitch = (-a.x).atan2(a.y.hypot(a.z)).to_degrees();
    (roll, pitch)
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl std::fmt::Debug for SpiritLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiritLevel")
            .field("samples", &self.window.len())
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl StatusOwner for SpiritLevel {
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
        self.table.validate(key, payload).map(|_| ())
    }
}

impl DevicePoll for SpiritLevel {
    fn poll(&mut self) -> PollState {
        match self.sensor.sample() {
            Ok(sample) => {
                if self.window.len() == Self::WINDOW {
                    self.window.pop_front();
                }
                self.window.push_back(sample);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accelerometer sample failed");
                return PollState::Idle;
            }
        }

        if let Some(mean) = self.mean() {
            let (roll, pitch) = angles(mean);
            self.table.set(ANGLE_X, StatusValue::Number(one_decimal(roll)));
            self.table.set(ANGLE_Y, StatusValue::Number(one_decimal(pitch)));
        }
        PollState::Idle
    }
}

impl AuxiliaryDevice for SpiritLevel {
    fn discovery_entries(&self, topics: &Topics, device: &DeviceInfo) -> Vec<DiscoveryEntry> {
        [(ANGLE_X, "Spirit Level Angle X"), (ANGLE_Y, "Spirit Level Angle Y")]
            .into_iter()
            .map(|(key, name)| {
                Entity::new(Component::Sensor, key, format!("spiritlevel_{key}"), name)
                    .state_topic(topics.inclination(key))
                    .unit("°")
                    .into_entry(device, topics)
            })
            .collect()
    }
}
