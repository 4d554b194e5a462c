// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task composition.
//!
//! All bridge tasks run as futures on the caller's task and are driven by
//! `tokio::select!`:
//!
//! | task             | start       | period                    |
//! |------------------|-------------|---------------------------|
//! | connection       | immediately | event driven              |
//! | commands         | connected   | event driven              |
//! | status publisher | discovery   | `cadence`                 |
//! | heater poll      | `+1 s`      | busy: yield, idle: 1 ms   |
//! | relay poll       | `+30 s`     | 10 s                      |
//! | inclination poll | `+5 s`      | 100 ms                    |

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use super::{BridgeContext, Dispatch, Phase, ResetReason};
use crate::protocol::{BrokerClient, BrokerEvent};
use crate::status::PollState;
use crate::subsystem::SubsystemKind;

/// Runs the bridge until a reset is requested.
///
/// `driver` is the future polling the broker connection; `events` receives
/// what it forwards. Device poll loops start immediately at their offsets,
/// independent of the broker connection.
pub async fn run<C, D>(
    ctx: &BridgeContext<C>,
    driver: D,
    events: &mut mpsc::Receiver<BrokerEvent>,
) -> ResetReason
where
    C: BrokerClient,
    D: Future<Output = ()>,
{
    tracing::info!(
        relay = ctx.subsystems.is_present(SubsystemKind::RelayControl),
        inclination = ctx.subsystems.is_present(SubsystemKind::Inclination),
        "Bridge starting"
    );

    tokio::select! {
        () = driver => ResetReason::Fault("broker connection driver stopped".to_string()),
        reason = ctx.serve(events) => reason,
        never = ctx.poll_devices() => match never {},
    }
}

impl<C: BrokerClient> BridgeContext<C> {
    /// Connects, announces discovery, then serves commands and publishes
    /// status until a reset is requested.
    async fn serve(&self, events: &mut mpsc::Receiver<BrokerEvent>) -> ResetReason {
        self.enter(Phase::Connecting);
        if let Err(reason) = self.await_connection(events).await {
            return reason;
        }

        self.subscribe_all().await;
        let report = self.registry.resync(&self.client).await;
        tracing::info!(
            registered = report.registered,
            failed = report.failed,
            "Discovery announced"
        );
        self.enter(Phase::DiscoverySynced);

        self.enter(Phase::Steady);
        tokio::select! {
            reason = self.command_loop(events) => reason,
            never = self.publish_loop() => match never {},
        }
    }

    async fn await_connection(
        &self,
        events: &mut mpsc::Receiver<BrokerEvent>,
    ) -> Result<(), ResetReason> {
        loop {
            match time::timeout(self.timing.connect_timeout, events.recv()).await {
                Ok(Some(BrokerEvent::Connected)) => return Ok(()),
                Ok(Some(event)) => tracing::debug!(?event, "Event before connection ignored"),
                Ok(None) => return Err(channel_closed()),
                Err(_) => tracing::warn!(
                    waited_secs = self.timing.connect_timeout.as_secs(),
                    "Still waiting for MQTT broker"
                ),
            }
        }
    }

    /// Subscribes to commands and Home Assistant liveness.
    ///
    /// Sessions are clean, so this runs after every (re)connection.
    async fn subscribe_all(&self) {
        let filters = [self.topics.command_filter(), self.topics.liveness().to_string()];
        for filter in &filters {
            if let Err(e) = self.client.subscribe(filter).await {
                tracing::warn!(filter = %filter, error = %e, "Subscription failed");
            }
        }
    }

    async fn command_loop(&self, events: &mut mpsc::Receiver<BrokerEvent>) -> ResetReason {
        while let Some(event) = events.recv().await {
            match event {
                BrokerEvent::Connected => {
                    tracing::info!("Broker reconnected, renewing subscriptions");
                    self.subscribe_all().await;
                }
                BrokerEvent::Disconnected => {
                    tracing::warn!("Broker connection lost, waiting for reconnect");
                }
                BrokerEvent::Message { topic, payload } => {
                    if let Dispatch::Reset(command) = self.handle(&topic, &payload).await {
                        return self.reset(command);
                    }
                }
            }
        }
        channel_closed()
    }

    async fn poll_devices(&self) -> Infallible {
        tokio::select! {
            never = self.poll_heater() => never,
            never = self.poll_auxiliary(
                SubsystemKind::RelayControl,
                self.timing.relay_start,
                self.timing.relay_period,
            ) => never,
            never = self.poll_auxiliary(
                SubsystemKind::Inclination,
                self.timing.inclination_start,
                self.timing.inclination_period,
            ) => never,
        }
    }

    /// Drains the heater's outbound queue as fast as possible, then backs off.
    async fn poll_heater(&self) -> Infallible {
        time::sleep(self.timing.heater_start).await;
        tracing::info!("Heater poll loop running");
        loop {
            match self.subsystems.poll(SubsystemKind::Primary) {
                Some(PollState::Busy) => tokio::task::yield_now().await,
                _ => time::sleep(self.timing.heater_idle).await,
            }
        }
    }

    async fn poll_auxiliary(
        &self,
        kind: SubsystemKind,
        start: Duration,
        period: Duration,
    ) -> Infallible {
        if !self.subsystems.is_present(kind) {
            return std::future::pending().await;
        }
        time::sleep(start).await;
        tracing::info!(subsystem = %kind, "Poll loop running");

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.subsystems.poll(kind);
        }
    }
}

fn channel_closed() -> ResetReason {
    ResetReason::Fault("broker event channel closed".to_string())
}
