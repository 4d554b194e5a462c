// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! System commands and the run modes they switch to.

use std::fmt;
use std::str::FromStr;

/// Payload that activates a system command.
pub const ACTIVATION_PAYLOAD: &str = "1";

/// Broker commands handled by the bridge itself instead of a subsystem.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::types::{RunMode, SystemCommand};
///
/// let cmd: SystemCommand = "os_run".parse().unwrap();
/// assert_eq!(cmd, SystemCommand::OsRun);
/// assert_eq!(cmd.run_mode(), Some(RunMode::AccessPoint));
/// assert!("target_temp_room".parse::<SystemCommand>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCommand {
    /// Soft reset into the current run mode.
    Reboot,
    /// Switch to the configuration/access-point mode, then reset.
    OsRun,
    /// Switch to the update mode, then reset.
    OtaUpdate,
}

impl SystemCommand {
    /// All system commands.
    pub const ALL: [Self; 3] = [Self::Reboot, Self::OsRun, Self::OtaUpdate];

    /// Returns the command key as used in the command topic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::OsRun => "os_run",
            Self::OtaUpdate => "ota_update",
        }
    }

    /// Returns the run mode to persist before resetting, if any.
    #[must_use]
    pub const fn run_mode(&self) -> Option<RunMode> {
        match self {
            Self::Reboot => None,
            Self::OsRun => Some(RunMode::AccessPoint),
            Self::OtaUpdate => Some(RunMode::Ota),
        }
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a key is not a system command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSystemCommand;

impl FromStr for SystemCommand {
    type Err = NotSystemCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reboot" => Ok(Self::Reboot),
            "os_run" => Ok(Self::OsRun),
            "ota_update" => Ok(Self::OtaUpdate),
            _ => Err(NotSystemCommand),
        }
    }
}

/// Mode the boot stage starts the device in after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Configuration web frontend behind a local access point.
    AccessPoint,
    /// Regular bridge operation.
    Normal,
    /// Over-the-air update of the installed modules.
    Ota,
}

impl RunMode {
    /// Returns the number the boot stage reads back.
    #[must_use]
    pub const fn as_num(&self) -> u8 {
        match self {
            Self::AccessPoint => 0,
            Self::Normal => 1,
            Self::Ota => 3,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessPoint => "access-point",
            Self::Normal => "normal",
            Self::Ota => "ota",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_command_round_trips_through_key() {
        for cmd in SystemCommand::ALL {
            assert_eq!(cmd.as_str().parse::<SystemCommand>(), Ok(cmd));
        }
    }

    #[test]
    fn system_command_keys_are_case_sensitive() {
        assert!("REBOOT".parse::<SystemCommand>().is_err());
    }

    #[test]
    fn reboot_keeps_run_mode() {
        assert_eq!(SystemCommand::Reboot.run_mode(), None);
        assert_eq!(SystemCommand::OtaUpdate.run_mode(), Some(RunMode::Ota));
    }

    #[test]
    fn run_mode_numbers() {
        assert_eq!(RunMode::AccessPoint.as_num(), 0);
        assert_eq!(RunMode::Normal.as_num(), 1);
        assert_eq!(RunMode::Ota.as_num(), 3);
    }
}
