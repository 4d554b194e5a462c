// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests against a mock MQTT broker (mockforge-mqtt).

#![cfg(feature = "mqtt")]

use std::time::Duration;

use inetbox_bridge::bridge::{self, BridgeContext, Phase};
use inetbox_bridge::discovery::{DeviceInfo, DiscoveryRegistry, builtin_entries};
use inetbox_bridge::protocol::{BrokerClient, BrokerEvent, MqttConnection, Topics};
use inetbox_bridge::subsystem::{HeaterPanel, Subsystems};
use inetbox_bridge::system::RunModeFile;
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    sleep(Duration::from_millis(500)).await;
}

fn connection(port: u16, client_id: &str) -> MqttConnection {
    MqttConnection::builder()
        .host("127.0.0.1")
        .port(port)
        .client_id(client_id)
        .reconnect_delay(Duration::from_millis(200))
        .last_will("service/truma/control_status/alive", "OFF")
        .build()
        .unwrap()
}

mod broker_connection {
    use super::*;

    #[tokio::test]
    async fn driver_reports_connection() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (client, driver, mut events) = connection(port, "inetbox_connect").into_parts();
        tokio::spawn(driver.run());

        let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert_eq!(event, Some(BrokerEvent::Connected));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn publish_and_subscribe_after_connect() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (client, driver, mut events) = connection(port, "inetbox_publish").into_parts();
        tokio::spawn(driver.run());
        timeout(Duration::from_secs(5), events.recv()).await.unwrap();

        assert!(client.subscribe("service/truma/set/#").await.is_ok());
        assert!(
            client
                .publish("service/truma/control_status/alive", "ON")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn unreachable_broker_keeps_client_offline() {
        let port = get_test_port();

        let (client, driver, _events) = connection(port, "inetbox_offline").into_parts();
        tokio::spawn(driver.run());
        sleep(Duration::from_millis(500)).await;

        assert!(!client.is_connected());
        assert!(client.publish("a/b", "1").await.is_err());
    }
}

mod bridge_run {
    use super::*;

    #[tokio::test]
    async fn bridge_reaches_steady_state() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let topics = Topics::default();
        let (client, driver, mut events) = connection(port, "inetbox_bridge_run").into_parts();
        let registry = DiscoveryRegistry::new(
            builtin_entries(&DeviceInfo::default(), &topics),
            topics.status("release"),
            "test",
        );
        let run_mode = std::env::temp_dir().join(format!("inetbox_it_{}", std::process::id()));
        let ctx = BridgeContext::new(
            client,
            Subsystems::new(HeaterPanel::new()),
            registry,
            RunModeFile::new(run_mode),
        );

        tokio::select! {
            reason = bridge::run(&ctx, driver.run(), &mut events) => panic!("bridge stopped: {reason}"),
            () = sleep(Duration::from_secs(2)) => {}
        }

        assert_eq!(ctx.phase(), Phase::Steady);
        assert!(ctx.client().is_connected());
    }
}
