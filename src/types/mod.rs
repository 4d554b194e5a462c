// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the bridge.
//!
//! # Types
//!
//! - [`StatusKey`] - Identifier of a status table entry
//! - [`StatusValue`] - Text, number or boolean held under a key
//! - [`SystemCommand`] - Reboot / access-point / OTA commands
//! - [`RunMode`] - Mode persisted for the boot stage

mod command;
mod status;

pub use command::{ACTIVATION_PAYLOAD, NotSystemCommand, RunMode, SystemCommand};
pub use status::{StatusKey, StatusValue};
