// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subsystem status tables.
//!
//! Every subsystem exposes its state as a flat table of
//! [`StatusKey`] → [`StatusValue`] pairs through the [`StatusOwner`]
//! capability. The bridge harvests tables with [`StatusOwner::get_all`] and
//! forwards broker commands with [`StatusOwner::set_status`].
//!
//! [`StatusTable`] is the concrete table the built-in subsystems are made of.
//! Each entry declares which payloads it [`Accepts`], so validation happens
//! in one place.

use std::collections::BTreeMap;

use crate::error::StatusError;
use crate::types::{StatusKey, StatusValue};

/// Full set of key/value pairs harvested from one subsystem.
pub type StatusSnapshot = Vec<(StatusKey, StatusValue)>;

/// Capability shared by every subsystem that owns status keys.
pub trait StatusOwner {
    /// Returns whether this subsystem owns `key`.
    fn owns(&self, key: &str) -> bool;

    /// Returns every key this subsystem owns.
    fn keys(&self) -> Vec<StatusKey>;

    /// Returns the current value of every key.
    ///
    /// Harvesting may clear one-shot flags such as the heartbeat.
    fn get_all(&mut self) -> StatusSnapshot;

    /// Applies a value received from the broker.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] if the key is unknown, read-only, or the
    /// payload is not accepted for it.
    fn set_status(&mut self, key: &str, payload: &str) -> Result<(), StatusError>;
}

/// Outcome of one poll step of a device loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Outbound data is still pending; poll again as soon as possible.
    Busy,
    /// Nothing pending; the loop may back off.
    Idle,
}

/// A subsystem driven by a periodic poll loop.
pub trait DevicePoll {
    /// Services the device once without blocking.
    fn poll(&mut self) -> PollState;
}

/// Payloads accepted for a status entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Accepts {
    /// The entry can only be changed by the device itself.
    ReadOnly,
    /// One of a fixed set of literal payloads.
    OneOf(&'static [&'static str]),
    /// A number within `min..=max`, or exactly `off` when set.
    Range {
        /// Lowest accepted value.
        min: f64,
        /// Highest accepted value.
        max: f64,
        /// Additional value outside the range meaning "off".
        off: Option<f64>,
    },
    /// A binary switch (`0`/`1`, `OFF`/`ON`, `false`/`true`).
    Switch,
}

impl Accepts {
    /// Parses and validates `payload` for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::ReadOnly`] for read-only entries and
    /// [`StatusError::InvalidValue`] for payloads outside the accepted set.
    pub fn parse(&self, key: &str, payload: &str) -> Result<StatusValue, StatusError> {
        let payload = payload.trim();
        let invalid = |expected: String| StatusError::InvalidValue {
            key: key.to_string(),
            value: payload.to_string(),
            expected,
        };

        match *self {
            Self::ReadOnly => Err(StatusError::ReadOnly(key.to_string())),
            Self::OneOf(options) => {
                if options.contains(&payload) {
                    Ok(StatusValue::parse_payload(payload))
                } else {
                    Err(invalid(options.join(", ")))
                }
            }
            Self::Range { min, max, off } => {
                let number = payload
                    .parse::<f64>()
                    .ok()
                    .filter(|n| (min..=max).contains(n) || Some(*n) == off);
                let expected = match off {
                    Some(off) => format!("{off} or {min}..={max}"),
                    None => format!("{min}..={max}"),
                };
                number.map(StatusValue::Number).ok_or_else(|| invalid(expected))
            }
            Self::Switch => match payload.to_ascii_uppercase().as_str() {
                "1" | "ON" | "TRUE" => Ok(StatusValue::Bool(true)),
                "0" | "OFF" | "FALSE" => Ok(StatusValue::Bool(false)),
                _ => Err(invalid("0, 1, ON or OFF".to_string())),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: StatusValue,
    accepts: Accepts,
}

/// An ordered status table with per-key validation.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::status::{Accepts, StatusTable};
/// use inetbox_bridge::types::StatusValue;
///
/// let mut table = StatusTable::new()
///     .with_entry("heating_mode", StatusValue::text("off"), Accepts::OneOf(&["off", "eco", "high"]))
///     .with_entry("clock", StatusValue::text("00:00"), Accepts::ReadOnly);
///
/// let value = table.validate("heating_mode", "eco").unwrap();
/// table.set("heating_mode", value);
/// assert_eq!(table.get("heating_mode"), Some(&StatusValue::text("eco")));
/// assert!(table.validate("clock", "12:00").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    entries: BTreeMap<StatusKey, Entry>,
}

impl StatusTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry with its initial value.
    #[must_use]
    pub fn with_entry(
        mut self,
        key: impl Into<StatusKey>,
        initial: StatusValue,
        accepts: Accepts,
    ) -> Self {
        self.entries.insert(
            key.into(),
            Entry {
                value: initial,
                accepts,
            },
        );
        self
    }

    /// Returns whether the table holds `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Validates a broker payload for `key` without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::UnknownKey`] if the key is not in the table,
    /// otherwise whatever [`Accepts::parse`] reports.
    pub fn validate(&self, key: &str, payload: &str) -> Result<StatusValue, StatusError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| StatusError::UnknownKey(key.to_string()))?;
        entry.accepts.parse(key, payload)
    }

    /// Stores a value reported by the device.
    ///
    /// Returns `true` if the value changed. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: StatusValue) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.value != value => {
                entry.value = value;
                true
            }
            _ => false,
        }
    }

    /// Returns every key in table order.
    pub fn keys(&self) -> impl Iterator<Item = &StatusKey> {
        self.entries.keys()
    }

    /// Returns a copy of every key/value pair in table order.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: &[&str] = &["off", "eco", "high"];

    fn table() -> StatusTable {
        StatusTable::new()
            .with_entry("heating_mode", StatusValue::text("off"), Accepts::OneOf(MODES))
            .with_entry(
                "target_temp_room",
                StatusValue::Number(0.0),
                Accepts::Range {
                    min: 5.0,
                    max: 30.0,
                    off: Some(0.0),
                },
            )
            .with_entry("relay", StatusValue::Bool(false), Accepts::Switch)
            .with_entry("clock", StatusValue::text("00:00"), Accepts::ReadOnly)
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = table().validate("missing", "1").unwrap_err();
        assert_eq!(err, StatusError::UnknownKey("missing".to_string()));
    }

    #[test]
    fn read_only_key_is_rejected() {
        let err = table().validate("clock", "12:00").unwrap_err();
        assert_eq!(err, StatusError::ReadOnly("clock".to_string()));
    }

    #[test]
    fn one_of_accepts_listed_payloads_only() {
        let table = table();
        assert_eq!(
            table.validate("heating_mode", "eco").unwrap(),
            StatusValue::text("eco")
        );
        assert!(matches!(
            table.validate("heating_mode", "boost"),
            Err(StatusError::InvalidValue { .. })
        ));
    }

    #[test]
    fn range_accepts_bounds_and_off_value() {
        let table = table();
        assert_eq!(
            table.validate("target_temp_room", "21").unwrap(),
            StatusValue::Number(21.0)
        );
        assert!(table.validate("target_temp_room", "5").is_ok());
        assert!(table.validate("target_temp_room", "30").is_ok());
        assert!(table.validate("target_temp_room", "0").is_ok());
        assert!(table.validate("target_temp_room", "3").is_err());
        assert!(table.validate("target_temp_room", "warm").is_err());
    }

    #[test]
    fn switch_accepts_common_spellings() {
        let table = table();
        assert_eq!(table.validate("relay", "1").unwrap(), StatusValue::Bool(true));
        assert_eq!(table.validate("relay", "on").unwrap(), StatusValue::Bool(true));
        assert_eq!(table.validate("relay", "OFF").unwrap(), StatusValue::Bool(false));
        assert!(table.validate("relay", "2").is_err());
    }

    #[test]
    fn set_reports_changes() {
        let mut table = table();
        assert!(table.set("heating_mode", StatusValue::text("high")));
        assert!(!table.set("heating_mode", StatusValue::text("high")));
        assert!(!table.set("missing", StatusValue::text("x")));
    }

    #[test]
    fn snapshot_is_ordered_by_key() {
        let keys: Vec<_> = table()
            .snapshot()
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, ["clock", "heating_mode", "relay", "target_temp_room"]);
    }
}
