// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware drivers for the auxiliary subsystems.
//!
//! The auxiliaries talk to their hardware through two small driver traits,
//! [`RelayBoard`] and [`Accelerometer`]. A [`Platform`] resolves the drivers
//! available on the host. Only the in-memory `sim` platform ships drivers;
//! any other platform reports [`HardwareError::Unsupported`].

mod sim;

pub use sim::{SimAccelerometer, SimRelayBoard};

use std::fmt;
use std::str::FromStr;

use crate::error::HardwareError;

/// Number of relay inputs and outputs on the board.
pub const RELAY_CHANNELS: usize = 2;

/// Digital I/O of the gas bottle relay board.
pub trait RelayBoard {
    /// Reads the input lines.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Read`] if the lines cannot be sampled.
    fn read_inputs(&mut self) -> Result<[bool; RELAY_CHANNELS], HardwareError>;

    /// Drives the output lines.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Write`] if the lines cannot be driven.
    fn write_outputs(&mut self, outputs: [bool; RELAY_CHANNELS]) -> Result<(), HardwareError>;
}

/// One accelerometer sample in units of g.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceleration {
    /// Longitudinal axis.
    pub x: f64,
    /// Lateral axis.
    pub y: f64,
    /// Vertical axis.
    pub z: f64,
}

impl Acceleration {
    /// A sensor lying flat.
    pub const LEVEL: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };
}

/// Three-axis accelerometer.
pub trait Accelerometer {
    /// Takes one sample.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Read`] if the sensor does not answer.
    fn sample(&mut self) -> Result<Acceleration, HardwareError>;
}

/// Host platform the bridge runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// In-memory drivers.
    Sim,
    /// A board without host drivers.
    Other(String),
}

impl Platform {
    /// Returns the relay board driver.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unsupported`] if the platform has no driver.
    pub fn relay_board(&self) -> Result<Box<dyn RelayBoard>, HardwareError> {
        match self {
            Self::Sim => Ok(Box::new(SimRelayBoard::default())),
            Self::Other(platform) => Err(HardwareError::Unsupported {
                platform: platform.clone(),
                feature: "relay control".to_string(),
            }),
        }
    }

    /// Returns the accelerometer driver.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unsupported`] if the platform has no driver.
    pub fn accelerometer(&self) -> Result<Box<dyn Accelerometer>, HardwareError> {
        match self {
            Self::Sim => Ok(Box::new(SimAccelerometer::default())),
            Self::Other(platform) => Err(HardwareError::Unsupported {
                platform: platform.clone(),
                feature: "inclination".to_string(),
            }),
        }
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Self::Sim,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sim => f.write_str("sim"),
            Self::Other(name) => f.write_str(name),
        }
    }
}
