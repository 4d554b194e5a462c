// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orchestration of the bridge.
//!
//! A [`BridgeContext`] is built once at startup and owns everything the
//! bridge tasks share: the broker client, the subsystems, the discovery
//! registry and the topic layout. The tasks borrow it for the lifetime of
//! [`run`]; there is no other global state.
//!
//! # Lifecycle
//!
//! ```text
//! Idle → Connecting → DiscoverySynced → Steady → Resetting
//! ```
//!
//! The bridge never shuts down cleanly. [`run`] only returns when a system
//! command or a fatal fault requests a reset, and the caller is expected to
//! restart the process.

mod dispatch;
mod publisher;
mod scheduler;

pub use dispatch::Dispatch;
pub use publisher::CycleReport;
pub use scheduler::run;

use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use crate::discovery::DiscoveryRegistry;
use crate::protocol::Topics;
use crate::subsystem::Subsystems;
use crate::system::SystemControl;
use crate::types::SystemCommand;

/// Lifecycle phase of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, not running.
    Idle,
    /// Waiting for the first broker connection.
    Connecting,
    /// Subscribed and discovery announced.
    DiscoverySynced,
    /// Publishing status and serving commands.
    Steady,
    /// A reset was requested.
    Resetting,
}

/// Why [`run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    /// A system command was received.
    Command(SystemCommand),
    /// The bridge cannot continue.
    Fault(String),
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => write!(f, "system command {command}"),
            Self::Fault(reason) => write!(f, "fault: {reason}"),
        }
    }
}

/// Periods and start offsets of the bridge tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Period of the status publishing cycle.
    pub cadence: Duration,
    /// The heartbeat is asserted on every n-th cycle.
    pub heartbeat_every: u64,
    /// Delay before the heater poll loop starts.
    pub heater_start: Duration,
    /// Back-off of the heater poll loop when nothing is pending.
    pub heater_idle: Duration,
    /// Delay before the relay poll loop starts.
    pub relay_start: Duration,
    /// Period of the relay poll loop.
    pub relay_period: Duration,
    /// Delay before the inclination poll loop starts.
    pub inclination_start: Duration,
    /// Period of the inclination poll loop.
    pub inclination_period: Duration,
    /// Wait for the first broker connection before warning.
    pub connect_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(10),
            heartbeat_every: 6,
            heater_start: Duration::from_secs(1),
            heater_idle: Duration::from_millis(1),
            relay_start: Duration::from_secs(30),
            relay_period: Duration::from_secs(10),
            inclination_start: Duration::from_secs(5),
            inclination_period: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything the bridge tasks share.
pub struct BridgeContext<C> {
    client: C,
    subsystems: Subsystems,
    registry: DiscoveryRegistry,
    topics: Topics,
    timing: Timing,
    system: Box<dyn SystemControl>,
    phase: Cell<Phase>,
}

impl<C> BridgeContext<C> {
    /// Creates a context with default topics and timing.
    #[must_use]
    pub fn new(
        client: C,
        subsystems: Subsystems,
        registry: DiscoveryRegistry,
        system: impl SystemControl + 'static,
    ) -> Self {
        Self {
            client,
            subsystems,
            registry,
            topics: Topics::default(),
            timing: Timing::default(),
            system: Box::new(system),
            phase: Cell::new(Phase::Idle),
        }
    }

    /// Sets the topic layout.
    #[must_use]
    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    /// Sets task periods and offsets.
    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Broker client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Subsystems served by the bridge.
    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    /// Discovery registry.
    pub fn registry(&self) -> &DiscoveryRegistry {
        &self.registry
    }

    /// Topic layout.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Task periods and offsets.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    fn enter(&self, phase: Phase) {
        let previous = self.phase.replace(phase);
        if previous != phase {
            tracing::debug!(?previous, ?phase, "Bridge phase changed");
        }
    }

    /// Moves to [`Phase::Resetting`] and persists the run mode of `command`.
    ///
    /// A failed write is logged; the reset proceeds regardless.
    fn reset(&self, command: SystemCommand) -> ResetReason {
        self.enter(Phase::Resetting);
        if let Some(mode) = command.run_mode()
            && let Err(e) = self.system.set_run_mode(mode)
        {
            tracing::error!(error = %e, %mode, "Failed to persist run mode");
        }
        tracing::info!(%command, "Reset requested");
        ResetReason::Command(command)
    }
}

impl<C: fmt::Debug> fmt::Debug for BridgeContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("client", &self.client)
            .field("subsystems", &self.subsystems)
            .field("topics", &self.topics)
            .field("phase", &self.phase.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::discovery::tests::RecordingClient;
    use crate::discovery::{DeviceInfo, builtin_entries};
    use crate::error::Error;
    use crate::subsystem::tests::{CallLog, FakeDevice};
    use crate::types::RunMode;

    /// Records persisted run modes; optionally fails every write.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingSystem {
        pub modes: Rc<RefCell<Vec<RunMode>>>,
        pub fail: bool,
    }

    impl SystemControl for RecordingSystem {
        fn set_run_mode(&self, mode: RunMode) -> Result<(), Error> {
            if self.fail {
                return Err(Error::Io(std::io::Error::other("read-only")));
            }
            self.modes.borrow_mut().push(mode);
            Ok(())
        }
    }

    pub(crate) struct Fixture {
        pub ctx: BridgeContext<RecordingClient>,
        pub heater: CallLog,
        pub relay: Option<CallLog>,
        pub inclination: Option<CallLog>,
        pub system: RecordingSystem,
    }

    pub(crate) fn fixture(with_relay: bool) -> Fixture {
        fixture_with(with_relay, false)
    }

    /// A context over fakes: the heater owns `target_temp_room`, the relay
    /// (when present) owns `duo_ctrl_i`, the inclination sensor (when
    /// present) reports `angle_x`.
    pub(crate) fn fixture_with(with_relay: bool, with_inclination: bool) -> Fixture {
        let (heater, heater_calls) = FakeDevice::new(&["target_temp_room", "heating_mode"]);
        let mut subsystems = Subsystems::new(heater);
        let mut relay_calls = None;
        if with_relay {
            let (relay, calls) = FakeDevice::new(&["duo_ctrl_i"]);
            subsystems = subsystems.with_relay(Some(Box::new(relay)));
            relay_calls = Some(calls);
        }
        let mut inclination_calls = None;
        if with_inclination {
            let (level, calls) = FakeDevice::new(&["angle_x"]);
            subsystems = subsystems.with_inclination(Some(Box::new(level)));
            inclination_calls = Some(calls);
        }
        let topics = Topics::default();
        let registry = DiscoveryRegistry::new(
            builtin_entries(&DeviceInfo::default(), &topics),
            topics.status("release"),
            "1.0.0",
        );
        let system = RecordingSystem::default();
        let ctx = BridgeContext::new(
            RecordingClient::default(),
            subsystems,
            registry,
            system.clone(),
        );
        Fixture {
            ctx,
            heater: heater_calls,
            relay: relay_calls,
            inclination: inclination_calls,
            system,
        }
    }

    #[test]
    fn new_context_is_idle() {
        let fixture = fixture(false);
        assert_eq!(fixture.ctx.phase(), Phase::Idle);
    }

    #[test]
    fn reset_persists_run_mode() {
        let fixture = fixture(false);
        let reason = fixture.ctx.reset(SystemCommand::OtaUpdate);
        assert_eq!(reason, ResetReason::Command(SystemCommand::OtaUpdate));
        assert_eq!(fixture.ctx.phase(), Phase::Resetting);
        assert_eq!(*fixture.system.modes.borrow(), vec![RunMode::Ota]);
    }

    #[test]
    fn reboot_keeps_run_mode() {
        let fixture = fixture(false);
        fixture.ctx.reset(SystemCommand::Reboot);
        assert!(fixture.system.modes.borrow().is_empty());
    }

    #[test]
    fn failed_run_mode_write_still_resets() {
        let mut fixture = fixture(false);
        fixture.ctx.system = Box::new(RecordingSystem {
            fail: true,
            ..RecordingSystem::default()
        });
        let reason = fixture.ctx.reset(SystemCommand::OsRun);
        assert_eq!(reason, ResetReason::Command(SystemCommand::OsRun));
        assert_eq!(fixture.ctx.phase(), Phase::Resetting);
    }

    #[test]
    fn reset_reason_display() {
        assert_eq!(
            ResetReason::Command(SystemCommand::Reboot).to_string(),
            "system command reboot"
        );
        assert_eq!(
            ResetReason::Fault("gone".to_string()).to_string(),
            "fault: gone"
        );
    }
}
