// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic status publishing.

use std::convert::Infallible;

use tokio::time::{self, Instant, MissedTickBehavior};

use super::BridgeContext;
use crate::protocol::BrokerClient;
use crate::subsystem::SubsystemKind;

/// Outcome of one publishing cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Values published.
    pub published: usize,
    /// Publishes that failed.
    pub failed: usize,
    /// Whether the heartbeat was asserted this cycle.
    pub heartbeat: bool,
}

impl<C: BrokerClient> BridgeContext<C> {
    /// Publishes the full status of every present subsystem once.
    ///
    /// Cycles are numbered from 1; every `heartbeat_every`-th cycle asserts
    /// the heartbeat before harvesting. Publish order is heater, relay board,
    /// inclination sensor.
    pub async fn publish_cycle(&self, cycle: u64) -> CycleReport {
        let mut report = CycleReport::default();
        if self.timing.heartbeat_every > 0 && cycle % self.timing.heartbeat_every == 0 {
            self.subsystems.mark_alive();
            report.heartbeat = true;
        }

        for kind in SubsystemKind::ALL {
            // The borrow ends inside harvest, before any publish.
            let Some(snapshot) = self.subsystems.harvest(kind) else {
                continue;
            };
            for (key, value) in snapshot {
                let topic = kind.status_topic(&self.topics, key.as_str());
                let payload = value.to_string();
                tracing::debug!(topic = %topic, payload = %payload, "Publishing status");
                match self.client.publish(&topic, &payload).await {
                    Ok(()) => report.published += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::debug!(subsystem = %kind, key = %key, error = %e, "Status publish failed");
                    }
                }
            }
        }
        report
    }

    /// Publishes status every cadence period, forever.
    ///
    /// The first cycle runs one period after the call.
    pub(crate) async fn publish_loop(&self) -> Infallible {
        let cadence = self.timing.cadence;
        let mut ticker = time::interval_at(Instant::now() + cadence, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycle: u64 = 0;
        loop {
            ticker.tick().await;
            cycle = cycle.wrapping_add(1);
            let report = self.publish_cycle(cycle).await;
            if report.failed > 0 {
                tracing::warn!(
                    cycle,
                    failed = report.failed,
                    published = report.published,
                    "Status cycle incomplete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::{fixture, fixture_with};
    use crate::discovery::tests::RecordingClient;
    use super::*;

    fn heartbeat_values(published: &[(String, String)]) -> Vec<String> {
        published
            .iter()
            .filter(|(topic, _)| topic == "service/truma/control_status/alive")
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    #[tokio::test]
    async fn heartbeat_only_on_every_sixth_cycle() {
        let f = fixture(false);
        let asserted: Vec<u64> = {
            let mut cycles = Vec::new();
            for cycle in 1..=18 {
                if f.ctx.publish_cycle(cycle).await.heartbeat {
                    cycles.push(cycle);
                }
            }
            cycles
        };
        assert_eq!(asserted, vec![6, 12, 18]);
        assert_eq!(heartbeat_values(&f.ctx.client().take()), vec!["ON"; 3]);
    }

    #[tokio::test]
    async fn publishes_full_snapshot_in_subsystem_order() {
        let f = fixture_with(true, true);
        let report = f.ctx.publish_cycle(1).await;

        assert_eq!(report.published, 4);
        assert!(!report.heartbeat);
        let topics: Vec<_> = f.ctx.client().take().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            topics,
            vec![
                "service/truma/control_status/target_temp_room",
                "service/truma/control_status/heating_mode",
                "service/truma/control_status/duo_ctrl_i",
                "service/spiritlevel/status/angle_x",
            ]
        );
    }

    #[tokio::test]
    async fn failed_publish_does_not_abort_cycle() {
        let mut f = fixture(true);
        f.ctx.client = RecordingClient::failing_on("target_temp_room");

        let report = f.ctx.publish_cycle(1).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.published, 2);
        let topics: Vec<_> = f.ctx.client().take().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            topics,
            vec![
                "service/truma/control_status/heating_mode",
                "service/truma/control_status/duo_ctrl_i",
            ]
        );
    }

    #[tokio::test]
    async fn unchanged_values_are_published_again() {
        let f = fixture(false);
        f.ctx.publish_cycle(1).await;
        let first = f.ctx.client().take();
        f.ctx.publish_cycle(2).await;
        assert_eq!(f.ctx.client().take(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_waits_one_cadence_before_first_cycle() {
        let f = fixture(false);
        let cadence = f.ctx.timing().cadence;

        tokio::select! {
            never = f.ctx.publish_loop() => match never {},
            () = time::sleep(cadence - Duration::from_millis(1)) => {}
        }
        assert!(f.ctx.client().published.borrow().is_empty());

        tokio::select! {
            never = f.ctx.publish_loop() => match never {},
            () = time::sleep(cadence * 3 + Duration::from_millis(1)) => {}
        }
        assert_eq!(f.ctx.client().take().len(), 3 * 2);
    }
}
