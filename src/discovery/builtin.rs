// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in heater entities.

use super::{Component, DeviceInfo, DiscoveryEntry, Entity};
use crate::protocol::Topics;
use crate::types::StatusKey;

/// Options offered for the room temperature select.
pub const ROOM_TEMP_OPTIONS: &[&str] = &["0", "10", "15", "18", "20", "21", "22"];
/// Options offered for the water temperature select.
pub const WATER_TEMP_OPTIONS: &[&str] = &["0", "40", "60", "200"];
/// Accepted heating modes.
pub const HEATING_MODES: &[&str] = &["off", "eco", "high"];
/// Accepted energy sources.
pub const ENERGY_MIXES: &[&str] = &["none", "gas", "electricity", "mix"];
/// Accepted electric power levels in watts.
pub const EL_POWER_LEVELS: &[&str] = &["0", "900", "1800"];

const ACTIVATION_OPTIONS: &[&str] = &["0", "1"];

struct Reading {
    key: &'static str,
    name: &'static str,
    component: Component,
    device_class: Option<&'static str>,
    unit: Option<&'static str>,
}

const fn reading(key: &'static str, name: &'static str) -> Reading {
    Reading {
        key,
        name,
        component: Component::Sensor,
        device_class: None,
        unit: None,
    }
}

const fn temperature(key: &'static str, name: &'static str) -> Reading {
    Reading {
        key,
        name,
        component: Component::Sensor,
        device_class: Some("temperature"),
        unit: Some("°C"),
    }
}

const READINGS: &[Reading] = &[
    Reading {
        key: StatusKey::HEARTBEAT,
        name: "TRUMA Alive",
        component: Component::BinarySensor,
        device_class: Some("running"),
        unit: None,
    },
    reading(StatusKey::RELEASE, "TRUMA Release"),
    temperature("current_temp_room", "TRUMA Current Temp Room"),
    temperature("current_temp_water", "TRUMA Current Temp Water"),
    temperature("target_temp_room", "TRUMA Target Temp Room"),
    temperature("target_temp_water", "TRUMA Target Temp Water"),
    reading("energy_mix", "TRUMA Energy Mix"),
    Reading {
        key: "el_power_level",
        name: "TRUMA Electric Power Level",
        component: Component::Sensor,
        device_class: Some("power"),
        unit: Some("W"),
    },
    reading("heating_mode", "TRUMA Heating Mode"),
    reading("operating_status", "TRUMA Operating Status"),
    reading("error_code", "TRUMA Error Code"),
    reading("clock", "TRUMA Clock"),
];

/// (object id, unique id, name, command key, options)
const SELECTS: &[(&str, &str, &str, &str, &[&str])] = &[
    ("target_temp_room", "truma_set_roomtemp", "TRUMA Set Room Temp", "target_temp_room", ROOM_TEMP_OPTIONS),
    ("target_temp_water", "truma_set_warmwater", "TRUMA Set Water Temp", "target_temp_water", WATER_TEMP_OPTIONS),
    ("heating_mode", "truma_set_heating_mode", "TRUMA Set Heating Mode", "heating_mode", HEATING_MODES),
    ("energy_mix", "truma_set_energy_mix", "TRUMA Set Energy Mix", "energy_mix", ENERGY_MIXES),
    ("el_power_level", "truma_set_el_power_level", "TRUMA Set Electrical Power Level", "el_power_level", EL_POWER_LEVELS),
    ("set_reboot", "truma_set_reboot", "TRUMA Set Reboot", "reboot", ACTIVATION_OPTIONS),
    ("set_os_run", "truma_set_os_run", "TRUMA Set OS Run", "os_run", ACTIVATION_OPTIONS),
    ("ota_update", "truma_ota_update", "TRUMA Set OTA Update", "ota_update", ACTIVATION_OPTIONS),
];

/// Renders the built-in heater entities.
///
/// Sensors come first in status-key order, followed by the selects.
#[must_use]
pub fn builtin_entries(device: &DeviceInfo, topics: &Topics) -> Vec<DiscoveryEntry> {
    let sensors = READINGS.iter().map(|r| {
        let mut entity = Entity::new(r.component, r.key, format!("truma_{}", r.key), r.name)
            .state_topic(topics.status(r.key));
        if let Some(class) = r.device_class {
            entity = entity.device_class(class);
        }
        if let Some(unit) = r.unit {
            entity = entity.unit(unit);
        }
        entity.into_entry(device, topics)
    });

    let selects = SELECTS.iter().map(|(object_id, unique_id, name, key, options)| {
        Entity::new(Component::Select, *object_id, *unique_id, *name)
            .command_topic(topics.command(key))
            .options(options)
            .into_entry(device, topics)
    });

    sensors.chain(selects).collect()
}
