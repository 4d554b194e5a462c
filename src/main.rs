// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `inetbox-bridge` - runs the heater bridge until a reset is requested.
//!
//! The process never exits cleanly: every reset ends with exit code 3 after
//! the requested run mode has been persisted, and the supervisor starts the
//! bridge again.

use std::process::ExitCode;
use std::time::Duration;

use inetbox_bridge::bridge::{self, BridgeContext, ResetReason, Timing};
use inetbox_bridge::config::Config;
use inetbox_bridge::discovery::{DeviceInfo, DiscoveryRegistry, builtin_entries};
use inetbox_bridge::error::HardwareError;
use inetbox_bridge::hardware::Platform;
use inetbox_bridge::logging;
use inetbox_bridge::protocol::{MqttConnection, Topics};
use inetbox_bridge::subsystem::{AuxiliaryDevice, DuoControl, HeaterPanel, SpiritLevel, Subsystems};
use inetbox_bridge::system::RunModeFile;
use inetbox_bridge::types::StatusKey;

/// Exit code asking the supervisor for a restart.
const RESET_EXIT_CODE: u8 = 3;

/// Payload of the heartbeat last will.
const LAST_WILL_PAYLOAD: &str = "OFF";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match configure() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("inetbox-bridge: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serve(config).await {
        Ok(reason) => {
            tracing::info!(%reason, "Bridge stopped, resetting");
            ExitCode::from(RESET_EXIT_CODE)
        }
        Err(e) => {
            tracing::error!(error = %e, "Bridge could not start");
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration and installs the log subscriber.
fn configure() -> inetbox_bridge::Result<Config> {
    let config = Config::load()?;
    logging::init(&config.logging)?;
    Ok(config)
}

async fn serve(config: Config) -> inetbox_bridge::Result<ResetReason> {
    let topics = Topics::new(&config.topics);
    let device = DeviceInfo {
        model: config.device.model.clone(),
        sw_version: config.device.sw_version.clone(),
        node_id: config.device.node_id.clone(),
    };
    let Ok(platform) = config.device.platform.parse::<Platform>();
    tracing::info!(%platform, release = %config.device.release, "Starting inetbox bridge");

    let subsystems = build_subsystems(&config, &platform);
    for key in subsystems.key_collisions() {
        tracing::warn!(key = %key, "Relay key shadowed by heater key, commands go to the heater");
    }

    let registry = DiscoveryRegistry::new(
        builtin_entries(&device, &topics),
        topics.status(StatusKey::RELEASE),
        config.device.release.as_str(),
    )
    .with_entries(subsystems.discovery_entries(&topics, &device));

    let mut builder = MqttConnection::builder()
        .host(&config.mqtt.host)
        .port(config.mqtt.port)
        .client_id(&config.mqtt.client_id)
        .keep_alive(Duration::from_secs(config.mqtt.keep_alive_secs))
        .reconnect_delay(Duration::from_secs(config.mqtt.reconnect_delay_secs))
        .last_will(topics.status(StatusKey::HEARTBEAT), LAST_WILL_PAYLOAD);
    if let Some((username, password)) = config.credentials() {
        builder = builder.credentials(username, password);
    }
    let (client, driver, mut events) = builder.build()?.into_parts();

    let timing = Timing {
        connect_timeout: Duration::from_secs(config.mqtt.connection_timeout_secs),
        ..Timing::default()
    };
    let ctx = BridgeContext::new(
        client,
        subsystems,
        registry,
        RunModeFile::new(&config.device.run_mode_file),
    )
    .with_topics(topics)
    .with_timing(timing);

    Ok(bridge::run(&ctx, driver.run(), &mut events).await)
}

fn build_subsystems(config: &Config, platform: &Platform) -> Subsystems {
    let relay = config.features.relay_control.then(|| {
        platform
            .relay_board()
            .map(|board| Box::new(DuoControl::new(board)) as Box<dyn AuxiliaryDevice>)
    });
    let inclination = config.features.inclination.then(|| {
        platform
            .accelerometer()
            .map(|sensor| Box::new(SpiritLevel::new(sensor)) as Box<dyn AuxiliaryDevice>)
    });

    Subsystems::new(HeaterPanel::new())
        .with_relay(present("relay control", relay))
        .with_inclination(present("inclination", inclination))
}

/// Resolves an optional auxiliary; driver errors leave it absent.
fn present(
    feature: &str,
    resolved: Option<Result<Box<dyn AuxiliaryDevice>, HardwareError>>,
) -> Option<Box<dyn AuxiliaryDevice>> {
    match resolved? {
        Ok(device) => {
            tracing::info!(feature, "Auxiliary subsystem enabled");
            Some(device)
        }
        Err(e) => {
            tracing::warn!(feature, error = %e, "Auxiliary subsystem unavailable");
            None
        }
    }
}
