// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device subsystems served by the bridge.
//!
//! The bridge always has one primary subsystem, the heater panel, and up to
//! two optional auxiliaries:
//!
//! | kind                          | receives commands | publishes under       |
//! |-------------------------------|-------------------|-----------------------|
//! | [`SubsystemKind::Primary`]      | yes, first        | status prefix         |
//! | [`SubsystemKind::RelayControl`] | yes, second       | status prefix         |
//! | [`SubsystemKind::Inclination`]  | no                | inclination prefix    |
//!
//! Presence of the auxiliaries is decided once at startup and never changes.
//! [`Subsystems`] keeps each subsystem in a `RefCell`; every access borrows
//! for the duration of one synchronous call only, so tasks interleaving on
//! a single thread never observe a borrow held across a suspension point.

mod heater;
mod inclination;
mod relay;

pub use heater::HeaterPanel;
pub use inclination::SpiritLevel;
pub use relay::DuoControl;

use std::cell::RefCell;
use std::fmt;

use crate::discovery::{DeviceInfo, DiscoveryEntry};
use crate::error::StatusError;
use crate::protocol::Topics;
use crate::status::{DevicePoll, PollState, StatusOwner, StatusSnapshot};
use crate::types::StatusKey;

/// Identifies one subsystem slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsystemKind {
    /// Heater panel.
    Primary,
    /// Relay board switching gas bottles.
    RelayControl,
    /// Inclination sensor.
    Inclination,
}

impl SubsystemKind {
    /// Publish order within one status cycle.
    pub const ALL: [Self; 3] = [Self::Primary, Self::RelayControl, Self::Inclination];

    /// Returns the status topic `key` of this subsystem is published to.
    #[must_use]
    pub fn status_topic(&self, topics: &Topics, key: &str) -> String {
        match self {
            Self::Primary | Self::RelayControl => topics.status(key),
            Self::Inclination => topics.inclination(key),
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "heater",
            Self::RelayControl => "relay",
            Self::Inclination => "inclination",
        };
        f.write_str(name)
    }
}

/// The heater panel subsystem.
pub trait PrimaryDevice: StatusOwner + DevicePoll {
    /// Asserts the heartbeat; the next harvest reports it and clears it.
    fn mark_alive(&mut self);
}

/// An optional subsystem that contributes its own discovery entries.
pub trait AuxiliaryDevice: StatusOwner + DevicePoll {
    /// Returns the discovery entries announcing this subsystem's keys.
    fn discovery_entries(&self, topics: &Topics, device: &DeviceInfo) -> Vec<DiscoveryEntry>;
}

type Auxiliary = RefCell<Box<dyn AuxiliaryDevice>>;

/// The primary subsystem and whichever auxiliaries are present.
pub struct Subsystems {
    primary: RefCell<Box<dyn PrimaryDevice>>,
    relay: Option<Auxiliary>,
    inclination: Option<Auxiliary>,
}

impl Subsystems {
    /// Creates the set with only the primary subsystem present.
    #[must_use]
    pub fn new(primary: impl PrimaryDevice + 'static) -> Self {
        Self {
            primary: RefCell::new(Box::new(primary)),
            relay: None,
            inclination: None,
        }
    }

    /// Sets the relay control subsystem.
    #[must_use]
    pub fn with_relay(mut self, relay: Option<Box<dyn AuxiliaryDevice>>) -> Self {
        self.relay = relay.map(RefCell::new);
        self
    }

    /// Sets the inclination subsystem.
    #[must_use]
    pub fn with_inclination(mut self, inclination: Option<Box<dyn AuxiliaryDevice>>) -> Self {
        self.inclination = inclination.map(RefCell::new);
        self
    }

    fn auxiliary(&self, kind: SubsystemKind) -> Option<&Auxiliary> {
        match kind {
            SubsystemKind::Primary => None,
            SubsystemKind::RelayControl => self.relay.as_ref(),
            SubsystemKind::Inclination => self.inclination.as_ref(),
        }
    }

    /// Returns whether the subsystem is present.
    #[must_use]
    pub fn is_present(&self, kind: SubsystemKind) -> bool {
        kind == SubsystemKind::Primary || self.auxiliary(kind).is_some()
    }

    /// Resolves the subsystem a command for `key` is routed to.
    ///
    /// The primary wins over the relay board; the inclination sensor never
    /// receives commands.
    #[must_use]
    pub fn command_owner(&self, key: &str) -> Option<SubsystemKind> {
        if self.primary.borrow().owns(key) {
            return Some(SubsystemKind::Primary);
        }
        self.relay
            .as_ref()
            .filter(|relay| relay.borrow().owns(key))
            .map(|_| SubsystemKind::RelayControl)
    }

    /// Forwards a broker value to one subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::UnknownKey`] if the subsystem is absent,
    /// otherwise whatever the subsystem reports.
    pub fn set_status(
        &self,
        kind: SubsystemKind,
        key: &str,
        payload: &str,
    ) -> Result<(), StatusError> {
        match kind {
            SubsystemKind::Primary => self.primary.borrow_mut().set_status(key, payload),
            _ => match self.auxiliary(kind) {
                Some(aux) => aux.borrow_mut().set_status(key, payload),
                None => Err(StatusError::UnknownKey(key.to_string())),
            },
        }
    }

    /// Harvests the full status table of one subsystem.
    ///
    /// Returns `None` if the subsystem is absent.
    pub fn harvest(&self, kind: SubsystemKind) -> Option<StatusSnapshot> {
        match kind {
            SubsystemKind::Primary => Some(self.primary.borrow_mut().get_all()),
            _ => self.auxiliary(kind).map(|aux| aux.borrow_mut().get_all()),
        }
    }

    /// Services one subsystem once.
    ///
    /// Returns `None` if the subsystem is absent.
    pub fn poll(&self, kind: SubsystemKind) -> Option<PollState> {
        match kind {
            SubsystemKind::Primary => Some(self.primary.borrow_mut().poll()),
            _ => self.auxiliary(kind).map(|aux| aux.borrow_mut().poll()),
        }
    }

    /// Asserts the primary heartbeat.
    pub fn mark_alive(&self) {
        self.primary.borrow_mut().mark_alive();
    }

    /// Collects discovery entries of every present auxiliary.
    #[must_use]
    pub fn discovery_entries(&self, topics: &Topics, device: &DeviceInfo) -> Vec<DiscoveryEntry> {
        [&self.relay, &self.inclination]
            .into_iter()
            .flatten()
            .flat_map(|aux| aux.borrow().discovery_entries(topics, device))
            .collect()
    }

    /// Returns relay keys shadowed by a primary key of the same name.
    ///
    /// Commands for these keys always reach the primary.
    #[must_use]
    pub fn key_collisions(&self) -> Vec<StatusKey> {
        let Some(relay) = &self.relay else {
            return Vec::new();
        };
        let primary = self.primary.borrow();
        relay
            .borrow()
            .keys()
            .into_iter()
            .filter(|key| primary.owns(key.as_str()))
            .collect()
    }
}

impl fmt::Debug for Subsystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subsystems")
            .field("relay", &self.relay.is_some())
            .field("inclination", &self.inclination.is_some())
            .finish_non_exhaustive()
    }
}
