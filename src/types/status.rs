// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status keys and values held in subsystem status tables.

use std::borrow::Borrow;
use std::fmt;

/// Identifier of one entry in a subsystem status table.
///
/// Keys are unique within one table but may coincide across subsystems.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::types::StatusKey;
///
/// let key = StatusKey::new("target_temp_room");
/// assert_eq!(key.as_str(), "target_temp_room");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusKey(String);

impl StatusKey {
    /// Key of the primary subsystem's heartbeat entry.
    pub const HEARTBEAT: &'static str = "alive";

    /// Key of the published release version.
    pub const RELEASE: &'static str = "release";

    /// Creates a new status key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the heartbeat key.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(Self::HEARTBEAT)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for StatusKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Current value of a status entry.
///
/// Values render on the wire as plain text. Booleans use `ON`/`OFF`, which is
/// what the broker last-will and Home Assistant binary sensors expect.
///
/// # Examples
///
/// ```
/// use inetbox_bridge::types::StatusValue;
///
/// assert_eq!(StatusValue::Number(21.0).to_string(), "21");
/// assert_eq!(StatusValue::Number(12.5).to_string(), "12.5");
/// assert_eq!(StatusValue::Bool(true).to_string(), "ON");
/// assert_eq!(StatusValue::text("eco").to_string(), "eco");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StatusValue {
    /// Free-form text such as a mode name.
    Text(String),
    /// Numeric reading or setpoint.
    Number(f64),
    /// Binary state.
    Bool(bool),
}

impl StatusValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Interprets a raw payload the way the panel does.
    ///
    /// Numeric payloads become numbers, everything else stays text.
    #[must_use]
    pub fn parse_payload(payload: &str) -> Self {
        let trimmed = payload.trim();
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Returns the value as a boolean if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a number if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Self::Number(number) => write!(f, "{number}"),
            Self::Bool(true) => f.write_str("ON"),
            Self::Bool(false) => f.write_str("OFF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_borrows_as_str() {
        let mut keys = std::collections::BTreeMap::new();
        keys.insert(StatusKey::new("clock"), 1);
        assert_eq!(keys.get("clock"), Some(&1));
    }

    #[test]
    fn heartbeat_key() {
        assert_eq!(StatusKey::heartbeat().as_str(), "alive");
    }

    #[test]
    fn parse_numeric_payload() {
        assert_eq!(StatusValue::parse_payload("21"), StatusValue::Number(21.0));
        assert_eq!(StatusValue::parse_payload(" 7.5 "), StatusValue::Number(7.5));
    }

    #[test]
    fn parse_text_payload() {
        assert_eq!(StatusValue::parse_payload("eco"), StatusValue::text("eco"));
        assert_eq!(StatusValue::parse_payload("NaN"), StatusValue::text("NaN"));
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(StatusValue::Number(1800.0).to_string(), "1800");
        assert_eq!(StatusValue::Number(-2.0).to_string(), "-2");
        assert_eq!(StatusValue::Number(0.1).to_string(), "0.1");
    }

    #[test]
    fn bool_display() {
        assert_eq!(StatusValue::Bool(false).to_string(), "OFF");
        assert_eq!(StatusValue::Bool(true).to_string(), "ON");
    }
}
