// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `inetbox_bridge` - MQTT bridge for a Truma iNet heater panel.
//!
//! The bridge sits between the heater panel and an MQTT broker. It publishes
//! the heater state for Home Assistant, forwards setpoints from the broker to
//! the panel and announces itself through Home Assistant MQTT discovery.
//!
//! # Features
//!
//! - **Status publishing**: full heater status every 10 seconds, with a
//!   heartbeat once a minute
//! - **Commands**: room and water temperature, heating mode, energy source and
//!   electric power level
//! - **Discovery**: Home Assistant entities re-announced whenever Home
//!   Assistant comes online
//! - **Auxiliaries**: optional gas bottle relay board and spirit level
//! - **System commands**: reboot, configuration mode and update mode
//!
//! # Quick Start
//!
//! ```no_run
//! use inetbox_bridge::bridge::{self, BridgeContext};
//! use inetbox_bridge::discovery::{DeviceInfo, DiscoveryRegistry, builtin_entries};
//! use inetbox_bridge::protocol::{MqttConnection, Topics};
//! use inetbox_bridge::subsystem::{HeaterPanel, Subsystems};
//! use inetbox_bridge::system::RunModeFile;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> inetbox_bridge::Result<()> {
//!     let topics = Topics::default();
//!     let (client, driver, mut events) = MqttConnection::builder()
//!         .host("192.168.1.50")
//!         .last_will(topics.status("alive"), "OFF")
//!         .build()?
//!         .into_parts();
//!
//!     let registry = DiscoveryRegistry::new(
//!         builtin_entries(&DeviceInfo::default(), &topics),
//!         topics.status("release"),
//!         env!("CARGO_PKG_VERSION"),
//!     );
//!     let ctx = BridgeContext::new(
//!         client,
//!         Subsystems::new(HeaterPanel::new()),
//!         registry,
//!         RunModeFile::new("run_mode"),
//!     );
//!
//!     let reason = bridge::run(&ctx, driver.run(), &mut events).await;
//!     println!("reset: {reason}");
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod protocol;
pub mod status;
pub mod subsystem;
pub mod system;
pub mod types;

pub use bridge::{BridgeContext, Dispatch, Phase, ResetReason, Timing};
pub use config::Config;
pub use discovery::{DeviceInfo, DiscoveryEntry, DiscoveryRegistry, ResyncReport};
pub use error::{ConfigError, Error, HardwareError, Result, StatusError, TransportError};
pub use protocol::{BrokerClient, BrokerEvent, Topics};
pub use status::{PollState, StatusOwner};
pub use subsystem::{DuoControl, HeaterPanel, SpiritLevel, SubsystemKind, Subsystems};
pub use types::{RunMode, StatusKey, StatusValue, SystemCommand};
