// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT side using mockforge-mqtt.

use std::time::Duration;

use ez_matrix::entity::{CommandOutcome, Entity, SensorKind};
use ez_matrix::error::{Error, ProtocolError};
use ez_matrix::integration::{ConfigEntry, MatrixIntegration};
use ez_matrix::protocol::MqttBroker;
use ez_matrix::sync::STATUS_TOPIC;
use ez_matrix::types::{InputPort, InputSource, OutputPort};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::sleep;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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

    // Give the broker time to bind and accept connections
    sleep(Duration::from_millis(500)).await;
}

async fn connect_broker() -> MqttBroker {
    let port = get_test_port();
    start_mock_broker(port).await;

    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .await
        .unwrap()
}

async fn mock_device() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outputs": {"output_1_source": "Input 4", "output_2_source": "Input 1"},
            "inputs_edid_index": {"input_1_edid_index": 2},
            "cascade_mode": "Slave",
            "device_status": "OK"
        })))
        .mount(&server)
        .await;
    server
}

// ============================================================================
// MqttBroker Tests
// ============================================================================

mod mqtt_broker {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = MqttBroker::builder().host("127.0.0.1").port(port).build().await;
        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());

        let broker = result.unwrap();
        assert!(broker.is_connected());
        assert_eq!(broker.host(), "127.0.0.1");
        assert_eq!(broker.port(), port);
    }

    #[tokio::test]
    async fn connect_from_url() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = MqttBroker::from_url(&format!("mqtt://127.0.0.1:{port}"))
            .unwrap()
            .build()
            .await
            .unwrap();
        assert!(broker.is_connected());
    }

    #[tokio::test]
    async fn connect_refused_fails() {
        // Nothing listens on this port.
        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(get_test_port())
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe() {
        let broker = connect_broker().await;
        let (tx, _rx) = mpsc::channel(4);

        broker.subscribe(STATUS_TOPIC, tx).await.unwrap();
        assert_eq!(broker.subscription_count().await, 1);

        assert!(broker.unsubscribe(STATUS_TOPIC).await);
        assert!(!broker.unsubscribe(STATUS_TOPIC).await);
        assert_eq!(broker.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect() {
        let broker = connect_broker().await;
        broker.disconnect().await.unwrap();
        assert!(!broker.is_connected());
    }
}

// ============================================================================
// Integration Lifecycle Tests
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn setup_creates_entities() {
        let device = mock_device().await;
        let broker = connect_broker().await;
        let entry = ConfigEntry::new(device.uri()).with_entry_id("den");

        let matrix = MatrixIntegration::setup(&entry, &broker).await.unwrap();

        assert_eq!(matrix.sensors().len(), 2);
        assert_eq!(matrix.output_selects().len(), 2);
        assert_eq!(matrix.edid_selects().len(), 4);
        assert_eq!(broker.subscription_count().await, 1);

        let ids: Vec<&str> = matrix.edid_selects().iter().map(Entity::unique_id).collect();
        assert_eq!(
            ids,
            ["den_input_1_edid", "den_input_2_edid", "den_input_3_edid", "den_input_4_edid"]
        );

        let out1 = matrix.output_select(OutputPort::new(1).unwrap()).unwrap();
        assert_eq!(out1.unique_id(), "den_output_1_source");
        assert_eq!(out1.current_option(), Some(InputSource::Input4));

        let in1 = matrix.edid_select(InputPort::new(1).unwrap()).unwrap();
        assert_eq!(in1.current_option(), "2");

        let cascade = matrix.sensor(SensorKind::CascadeMode).unwrap();
        assert_eq!(cascade.state().as_deref(), Some("Slave"));
        assert_eq!(cascade.device_info().identifiers.1, "den");

        matrix.unload().await;
    }

    #[tokio::test]
    async fn setup_fails_when_device_unreachable() {
        let device = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&device)
            .await;
        let broker = connect_broker().await;
        let entry = ConfigEntry::new(device.uri());

        let result = MatrixIntegration::setup(&entry, &broker).await;

        assert!(matches!(result, Err(Error::UpdateFailed(_))));
        assert_eq!(broker.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn setup_rejects_url_without_host() {
        let broker = connect_broker().await;
        let entry = ConfigEntry::new("http://");

        let result = MatrixIntegration::setup(&entry, &broker).await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::InvalidAddress(_)))
        ));
    }

    #[tokio::test]
    async fn unload_stops_sync_and_unsubscribes() {
        let device = mock_device().await;
        let broker = connect_broker().await;
        let entry = ConfigEntry::new(device.uri());

        let matrix = MatrixIntegration::setup(&entry, &broker).await.unwrap();
        let sync = matrix.sync().clone();
        assert!(sync.is_running());

        matrix.unload().await;

        assert!(!sync.is_running());
        assert_eq!(broker.subscription_count().await, 0);
        assert!(broker.is_connected());
    }

    #[tokio::test]
    async fn select_output_through_integration() {
        let device = mock_device().await;
        Mock::given(method("POST"))
            .and(path("/output/switch"))
            .and(body_json(json!({"output_number": 2, "input_number": 3})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&device)
            .await;
        let broker = connect_broker().await;
        let entry = ConfigEntry::new(device.uri());
        let matrix = MatrixIntegration::setup(&entry, &broker).await.unwrap();

        let outcome = matrix.select_output(2, "Input 3").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Accepted);

        assert!(matches!(
            matrix.select_output(3, "Input 3").await,
            Err(Error::Value(_))
        ));
        assert!(matches!(
            matrix.select_edid(1, "99").await,
            Err(Error::Value(_))
        ));

        matrix.unload().await;
        device.verify().await;
    }

    #[tokio::test]
    async fn push_sender_feeds_snapshot() {
        let device = mock_device().await;
        let broker = connect_broker().await;
        let entry = ConfigEntry::new(device.uri());
        let matrix = MatrixIntegration::setup(&entry, &broker).await.unwrap();
        let mut rx = matrix.sync().subscribe();

        // Same path the broker's event loop takes for a publish on the topic.
        matrix
            .sync()
            .push_sender()
            .send(r#"{"current_state": {"cascade_mode": "Master"}}"#.to_string())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();

        let cascade = matrix.sensor(SensorKind::CascadeMode).unwrap();
        assert_eq!(cascade.state().as_deref(), Some("Master"));
        // Wholesale replacement: outputs are gone from the snapshot.
        assert_eq!(matrix.output_selects()[0].current_option(), None);

        matrix.unload().await;
    }
}
