// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing of inbound broker messages.

use super::BridgeContext;
use crate::discovery::ResyncReport;
use crate::protocol::BrokerClient;
use crate::subsystem::SubsystemKind;
use crate::types::{ACTIVATION_PAYLOAD, SystemCommand};

const ONLINE: &str = "online";

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not addressed to the bridge, or a no-op payload.
    Ignored,
    /// Home Assistant came online; discovery was resynced.
    Resynced(ResyncReport),
    /// Forwarded to the subsystem owning the key.
    Forwarded(SubsystemKind),
    /// The owning subsystem refused the value.
    Rejected(SubsystemKind),
    /// No present subsystem owns the key.
    Unknown,
    /// A system command asks for a reset.
    Reset(SystemCommand),
}

impl<C: BrokerClient> BridgeContext<C> {
    /// Classifies and handles one inbound message.
    ///
    /// Only liveness messages touch the broker. System commands are reported
    /// as [`Dispatch::Reset`]; performing the reset is up to the caller.
    ///
    /// Liveness and system command payloads must match exactly; subsystems
    /// normalize their own values.
    pub async fn handle(&self, topic: &str, payload: &str) -> Dispatch {
        if topic == self.topics.liveness() {
            if payload != ONLINE {
                return Dispatch::Ignored;
            }
            tracing::info!("Home Assistant online");
            return Dispatch::Resynced(self.registry.resync(&self.client).await);
        }

        let Some(key) = self.topics.command_key(topic) else {
            return Dispatch::Ignored;
        };

        if let Ok(command) = key.parse::<SystemCommand>() {
            if payload == ACTIVATION_PAYLOAD {
                return Dispatch::Reset(command);
            }
            tracing::debug!(%command, payload, "System command not activated");
            return Dispatch::Ignored;
        }

        tracing::info!(key, payload, "Command received");
        let Some(kind) = self.subsystems.command_owner(key) else {
            tracing::debug!(key, "No subsystem owns key");
            return Dispatch::Unknown;
        };

        match self.subsystems.set_status(kind, key, payload) {
            Ok(()) => {
                tracing::debug!(subsystem = %kind, key, "Command forwarded");
                Dispatch::Forwarded(kind)
            }
            Err(e) => {
                tracing::warn!(subsystem = %kind, error = %e, "Command rejected");
                Dispatch::Rejected(kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::fixture;
    use super::*;

    #[tokio::test]
    async fn heater_key_reaches_heater_only() {
        let f = fixture(true);
        let dispatch = f.ctx.handle("service/truma/set/target_temp_room", "21").await;

        assert_eq!(dispatch, Dispatch::Forwarded(SubsystemKind::Primary));
        assert_eq!(*f.heater.borrow(), vec!["target_temp_room=21"]);
        assert!(f.relay.unwrap().borrow().is_empty());
    }

    #[tokio::test]
    async fn relay_key_reaches_relay_only() {
        let f = fixture(true);
        let dispatch = f.ctx.handle("service/truma/set/duo_ctrl_i", "1").await;

        assert_eq!(dispatch, Dispatch::Forwarded(SubsystemKind::RelayControl));
        assert!(f.heater.borrow().is_empty());
        assert_eq!(*f.relay.unwrap().borrow(), vec!["duo_ctrl_i=1"]);
    }

    #[tokio::test]
    async fn relay_key_without_relay_is_unknown() {
        let f = fixture(false);
        let dispatch = f.ctx.handle("service/truma/set/duo_ctrl_i", "1").await;

        assert_eq!(dispatch, Dispatch::Unknown);
        assert!(f.heater.borrow().is_empty());
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let f = fixture(false);
        let dispatch = f.ctx.handle("service/truma/set/heating_mode", "bad").await;
        assert_eq!(dispatch, Dispatch::Rejected(SubsystemKind::Primary));
    }

    #[tokio::test]
    async fn system_commands_are_never_routed() {
        let f = fixture(true);

        assert_eq!(
            f.ctx.handle("service/truma/set/reboot", "1").await,
            Dispatch::Reset(SystemCommand::Reboot)
        );
        assert_eq!(
            f.ctx.handle("service/truma/set/ota_update", "0").await,
            Dispatch::Ignored
        );
        assert!(f.heater.borrow().is_empty());
        assert!(f.relay.unwrap().borrow().is_empty());
        assert!(f.ctx.client().published.borrow().is_empty());
    }

    #[tokio::test]
    async fn online_triggers_one_resync() {
        let f = fixture(false);
        let dispatch = f.ctx.handle("homeassistant/status", "online").await;

        let n = f.ctx.registry().len();
        assert_eq!(
            dispatch,
            Dispatch::Resynced(ResyncReport {
                retracted: n,
                registered: n,
                failed: 0
            })
        );
        assert_eq!(f.ctx.client().published.borrow().len(), 2 * n + 1);
    }

    #[tokio::test]
    async fn offline_and_foreign_topics_are_ignored() {
        let f = fixture(false);
        assert_eq!(
            f.ctx.handle("homeassistant/status", "offline").await,
            Dispatch::Ignored
        );
        assert_eq!(f.ctx.handle("other/topic", "1").await, Dispatch::Ignored);
        assert!(f.ctx.client().published.borrow().is_empty());
    }

    #[tokio::test]
    async fn control_payloads_must_match_exactly() {
        let f = fixture(false);
        assert_eq!(
            f.ctx.handle("service/truma/set/reboot", " 1\n").await,
            Dispatch::Ignored
        );
        assert_eq!(
            f.ctx.handle("homeassistant/status", "online ").await,
            Dispatch::Ignored
        );
        assert!(f.ctx.client().published.borrow().is_empty());
        assert!(f.system.modes.borrow().is_empty());
    }

    #[tokio::test]
    async fn setpoint_payload_reaches_owner_untouched() {
        let f = fixture(false);
        assert_eq!(
            f.ctx.handle("service/truma/set/target_temp_room", " 21\n").await,
            Dispatch::Forwarded(SubsystemKind::Primary)
        );
        assert_eq!(*f.heater.borrow(), vec!["target_temp_room= 21\n"]);
    }
}
