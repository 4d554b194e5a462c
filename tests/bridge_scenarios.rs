// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end bridge scenarios over the public API with in-memory drivers.

use std::cell::RefCell;
use std::time::Duration;

use inetbox_bridge::bridge::{self, BridgeContext, Dispatch, Phase, ResetReason};
use inetbox_bridge::discovery::{DeviceInfo, DiscoveryRegistry, builtin_entries};
use inetbox_bridge::error::TransportError;
use inetbox_bridge::hardware::{SimAccelerometer, SimRelayBoard};
use inetbox_bridge::protocol::{BrokerClient, BrokerEvent, EVENT_CHANNEL_CAPACITY, Topics};
use inetbox_bridge::subsystem::{DuoControl, HeaterPanel, SpiritLevel, SubsystemKind, Subsystems};
use inetbox_bridge::system::SystemControl;
use inetbox_bridge::types::{RunMode, StatusValue, SystemCommand};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Default)]
struct Recorder {
    published: RefCell<Vec<(String, String)>>,
    subscribed: RefCell<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<(String, String)> {
        self.published.borrow_mut().drain(..).collect()
    }
}

impl BrokerClient for Recorder {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.published
            .borrow_mut()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.subscribed.borrow_mut().push(filter.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NoopSystem;

impl SystemControl for NoopSystem {
    fn set_run_mode(&self, _mode: RunMode) -> inetbox_bridge::Result<()> {
        Ok(())
    }
}

struct Rig {
    ctx: BridgeContext<Recorder>,
    relay: SimRelayBoard,
    level: SimAccelerometer,
}

fn rig(with_auxiliaries: bool) -> Rig {
    let topics = Topics::default();
    let device = DeviceInfo::default();
    let relay = SimRelayBoard::default();
    let level = SimAccelerometer::default();

    let mut subsystems = Subsystems::new(HeaterPanel::new());
    if with_auxiliaries {
        subsystems = subsystems
            .with_relay(Some(Box::new(DuoControl::new(Box::new(relay.clone())))))
            .with_inclination(Some(Box::new(SpiritLevel::new(Box::new(level.clone())))));
    }
    let registry = DiscoveryRegistry::new(
        builtin_entries(&device, &topics),
        topics.status("release"),
        "1.2.3",
    )
    .with_entries(subsystems.discovery_entries(&topics, &device));

    Rig {
        ctx: BridgeContext::new(Recorder::default(), subsystems, registry, NoopSystem),
        relay,
        level,
    }
}

fn heater_value(ctx: &BridgeContext<Recorder>, key: &str) -> Option<StatusValue> {
    ctx.subsystems()
        .harvest(SubsystemKind::Primary)?
        .into_iter()
        .find(|(k, _)| k.as_str() == key)
        .map(|(_, v)| v)
}

fn payloads_for<'a>(published: &'a [(String, String)], topic: &str) -> Vec<&'a str> {
    published
        .iter()
        .filter(|(t, _)| t == topic)
        .map(|(_, p)| p.as_str())
        .collect()
}

#[tokio::test]
async fn room_temperature_command_reaches_heater() {
    let rig = rig(true);

    let dispatch = rig
        .ctx
        .handle("service/truma/set/target_temp_room", "21")
        .await;
    assert_eq!(dispatch, Dispatch::Forwarded(SubsystemKind::Primary));

    rig.ctx.subsystems().poll(SubsystemKind::Primary);
    assert_eq!(
        heater_value(&rig.ctx, "target_temp_room"),
        Some(StatusValue::Number(21.0))
    );
}

#[tokio::test]
async fn relay_command_drives_output() {
    let rig = rig(true);

    let dispatch = rig.ctx.handle("service/truma/set/duo_ctrl_i", "1").await;
    assert_eq!(dispatch, Dispatch::Forwarded(SubsystemKind::RelayControl));

    rig.ctx.subsystems().poll(SubsystemKind::RelayControl);
    assert_eq!(rig.relay.outputs(), [true, false]);
}

#[tokio::test]
async fn relay_key_without_relay_is_dropped() {
    let rig = rig(false);
    assert_eq!(
        rig.ctx.handle("service/truma/set/duo_ctrl_i", "1").await,
        Dispatch::Unknown
    );
}

#[tokio::test]
async fn inclination_keys_are_not_commands() {
    let rig = rig(true);
    assert_eq!(
        rig.ctx.handle("service/truma/set/angle_x", "3").await,
        Dispatch::Unknown
    );
}

#[tokio::test]
async fn invalid_setpoint_is_rejected_without_side_effects() {
    let rig = rig(false);
    assert_eq!(
        rig.ctx.handle("service/truma/set/heating_mode", "turbo").await,
        Dispatch::Rejected(SubsystemKind::Primary)
    );
    assert_eq!(rig.ctx.subsystems().poll(SubsystemKind::Primary), Some(inetbox_bridge::PollState::Idle));
    assert_eq!(
        heater_value(&rig.ctx, "heating_mode"),
        Some(StatusValue::text("off"))
    );
}

#[tokio::test]
async fn online_resync_announces_auxiliaries() {
    let rig = rig(true);

    let Dispatch::Resynced(report) = rig.ctx.handle("homeassistant/status", "online").await else {
        panic!("expected resync");
    };
    assert_eq!(report.registered, rig.ctx.registry().len());

    let published = rig.ctx.client().take();
    let angle_x = "homeassistant/sensor/truma/angle_x/config";
    assert_eq!(payloads_for(&published, angle_x).len(), 2);
    assert_eq!(payloads_for(&published, angle_x)[0], "");
    assert_eq!(
        payloads_for(&published, "service/truma/control_status/release"),
        vec!["1.2.3"]
    );
}

#[tokio::test(start_paused = true)]
async fn one_minute_of_steady_state() {
    let rig = rig(true);
    let rad = 3_f64.to_radians();
    rig.level.set(inetbox_bridge::hardware::Acceleration {
        x: 0.0,
        y: rad.sin(),
        z: rad.cos(),
    });
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tx.send(BrokerEvent::Connected).await.unwrap();

    tokio::select! {
        reason = bridge::run(&rig.ctx, std::future::pending::<()>(), &mut rx) => {
            panic!("bridge stopped: {reason}")
        }
        () = sleep(Duration::from_millis(60_500)) => {}
    }

    assert_eq!(rig.ctx.phase(), Phase::Steady);
    let published = rig.ctx.client().take();
    let alive = payloads_for(&published, "service/truma/control_status/alive");
    assert_eq!(alive, vec!["OFF", "OFF", "OFF", "OFF", "OFF", "ON"]);
    let angle = payloads_for(&published, "service/spiritlevel/status/angle_x");
    assert_eq!(angle.len(), 6);
    assert_eq!(angle.last().copied(), Some("3"));
    assert_eq!(
        payloads_for(&published, "service/truma/control_status/duo_ctrl_gas_green").len(),
        6
    );
}

#[tokio::test(start_paused = true)]
async fn reboot_command_ends_run_without_routing() {
    let rig = rig(true);
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tx.send(BrokerEvent::Connected).await.unwrap();
    tx.send(BrokerEvent::message("service/truma/set/reboot", "1"))
        .await
        .unwrap();

    let reason = bridge::run(&rig.ctx, std::future::pending::<()>(), &mut rx).await;

    assert_eq!(reason, ResetReason::Command(SystemCommand::Reboot));
    assert_eq!(rig.ctx.phase(), Phase::Resetting);
}
