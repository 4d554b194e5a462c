// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory drivers.
//!
//! Clones share state, so a caller can keep one handle to stimulate inputs
//! and inspect outputs while the subsystem owns the other.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Acceleration, Accelerometer, RELAY_CHANNELS, RelayBoard};
use crate::error::HardwareError;

#[derive(Debug, Default)]
struct RelayLines {
    inputs: [bool; RELAY_CHANNELS],
    outputs: [bool; RELAY_CHANNELS],
}

/// Simulated relay board.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::hardware::{RelayBoard, SimRelayBoard};
///
/// let handle = SimRelayBoard::default();
/// let mut board = handle.clone();
///
/// handle.set_inputs([true, false]);
/// assert_eq!(board.read_inputs().unwrap(), [true, false]);
///
/// board.write_outputs([false, true]).unwrap();
/// assert_eq!(handle.outputs(), [false, true]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimRelayBoard {
    lines: Rc<RefCell<RelayLines>>,
}

impl SimRelayBoard {
    /// Sets the input lines.
    pub fn set_inputs(&self, inputs: [bool; RELAY_CHANNELS]) {
        self.lines.borrow_mut().inputs = inputs;
    }

    /// Returns the last driven output lines.
    #[must_use]
    pub fn outputs(&self) -> [bool; RELAY_CHANNELS] {
        self.lines.borrow().outputs
    }
}

impl RelayBoard for SimRelayBoard {
    fn read_inputs(&mut self) -> Result<[bool; RELAY_CHANNELS], HardwareError> {
        Ok(self.lines.borrow().inputs)
    }

    fn write_outputs(&mut self, outputs: [bool; RELAY_CHANNELS]) -> Result<(), HardwareError> {
        self.lines.borrow_mut().outputs = outputs;
        Ok(())
    }
}

/// Simulated accelerometer returning a settable attitude.
#[derive(Debug, Clone)]
pub struct SimAccelerometer {
    attitude: Rc<Cell<Acceleration>>,
}

impl SimAccelerometer {
    /// Sets the reading returned by the next samples.
    pub fn set(&self, attitude: Acceleration) {
        self.attitude.set(attitude);
    }
}

impl Default for SimAccelerometer {
    fn default() -> Self {
        Self {
            attitude: Rc::new(Cell::new(Acceleration::LEVEL)),
        }
    }
}

impl Accelerometer for SimAccelerometer {
    fn sample(&mut self) -> Result<Acceleration, HardwareError> {
        Ok(self.attitude.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accelerometer_starts_level() {
        let mut sensor = SimAccelerometer::default();
        assert_eq!(sensor.sample().unwrap(), Acceleration::LEVEL);
    }

    #[test]
    fn accelerometer_clones_share_attitude() {
        let handle = SimAccelerometer::default();
        let mut sensor = handle.clone();
        let tilted = Acceleration {
            x: 0.5,
            y: 0.0,
            z: 0.87,
        };
        handle.set(tilted);
        assert_eq!(sensor.sample().unwrap(), tilted);
    }
}
