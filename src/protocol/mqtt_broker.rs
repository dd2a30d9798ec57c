// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection for push updates.
//!
//! The switcher's serial bridge publishes a status message on a fixed topic
//! whenever the device state changes. [`MqttBroker`] keeps one persistent
//! connection and forwards every payload received on a subscribed topic
//! into a channel.
//!
//! The connection survives broker restarts: after an error the event loop
//! waits [`reconnect_delay`](MqttBrokerBuilder::reconnect_delay) and
//! reconnects, then subscribes to every registered topic again.
//!
//! # Examples
//!
//! ```no_run
//! use ez_matrix::protocol::MqttBroker;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> ez_matrix::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! broker.subscribe("serial/status", tx).await?;
//!
//! while let Some(payload) = rx.recv().await {
//!     println!("push: {payload}");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::error::ProtocolError;

/// Standard MQTT port.
const DEFAULT_PORT: u16 = 1883;

/// Depth of the rumqttc request queue.
const REQUEST_CAPACITY: usize = 16;

/// Suffix source for client ids, unique within the process.
static NEXT_CLIENT: AtomicU64 = AtomicU64::new(0);

/// Connection parameters collected by [`MqttBrokerBuilder`].
#[derive(Debug, Clone)]
struct BrokerOptions {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    reconnect_delay: Duration,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl BrokerOptions {
    fn mqtt_options(&self) -> MqttOptions {
        let client_id = format!(
            "ez_matrix_{}_{}",
            std::process::id(),
            NEXT_CLIENT.fetch_add(1, Ordering::Relaxed)
        );

        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// A persistent MQTT broker connection.
///
/// Clones share the connection and the subscription table. The event
/// loop stops once [`disconnect`](Self::disconnect) is called or the last
/// clone is dropped.
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<Shared>,
}

struct Shared {
    client: AsyncClient,
    /// Push channels keyed by exact topic.
    subscriptions: RwLock<HashMap<String, mpsc::Sender<String>>>,
    options: BrokerOptions,
    connected: AtomicBool,
    closing: AtomicBool,
}

impl MqttBroker {
    /// Returns a builder with the default port, keep-alive and timeouts.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns a builder for a URL such as `mqtt://host:1883`.
    ///
    /// `mqtt://` and `tcp://` are accepted, as is a bare `host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for another scheme, a
    /// missing host or a bad port.
    pub fn from_url(url: &str) -> Result<MqttBrokerBuilder, ProtocolError> {
        let (host, port) = parse_broker_url(url)?;
        Ok(MqttBrokerBuilder::default().host(host).port(port))
    }

    /// Returns `true` while the broker session is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.options.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.options.port
    }

    /// Subscribes to `topic` and forwards each payload into `sender`.
    ///
    /// A later subscription to the same topic replaces the sender. The
    /// subscription is renewed automatically after a reconnect.
    ///
    /// # Errors
    ///
    /// Returns error if the MQTT subscription fails.
    pub async fn subscribe(
        &self,
        topic: impl Into<String>,
        sender: mpsc::Sender<String>,
    ) -> Result<(), ProtocolError> {
        let topic = topic.into();

        self.inner
            .client
            .subscribe(&topic, QoS::AtLeastOnce)
            .await
            .map_err(ProtocolError::Mqtt)?;

        tracing::debug!(topic = %topic, "Subscribed to push topic");

        self.inner.subscriptions.write().await.insert(topic, sender);
        Ok(())
    }

    /// Cancels a subscription.
    ///
    /// Returns `true` if the topic was subscribed.
    pub async fn unsubscribe(&self, topic: &str) -> bool {
        let removed = self.inner.subscriptions.write().await.remove(topic).is_some();

        if let Err(e) = self.inner.client.unsubscribe(topic).await {
            tracing::warn!(topic = %topic, error = %e, "Failed to unsubscribe from push topic");
        } else {
            tracing::debug!(topic = %topic, "Unsubscribed from push topic");
        }

        removed
    }

    /// Returns the number of active subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().await.len()
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.options.host,
            port = self.inner.options.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.closing.store(true, Ordering::Release);
        self.inner.subscriptions.write().await.clear();
        self.inner.connected.store(false, Ordering::Release);

        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)
    }

    async fn deliver(&self, topic: &str, payload: String) {
        let sender = self.inner.subscriptions.read().await.get(topic).cloned();

        let Some(sender) = sender else {
            tracing::trace!(topic = %topic, "No subscriber for topic");
            return;
        };

        if sender.send(payload).await.is_err() {
            tracing::debug!(topic = %topic, "Push receiver dropped");
        }
    }

    /// Re-issues every registered subscription on a fresh clean session.
    ///
    /// Runs on the event loop task, so requests are queued without waiting.
    async fn resubscribe(&self) {
        let topics: Vec<String> = self.inner.subscriptions.read().await.keys().cloned().collect();

        for topic in topics {
            match self.inner.client.try_subscribe(&topic, QoS::AtLeastOnce) {
                Ok(()) => tracing::debug!(topic = %topic, "Resubscribed to push topic"),
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Failed to resubscribe to push topic");
                }
            }
        }
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("address", &format_args!("{}:{}", self.host(), self.port()))
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for [`MqttBroker`].
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    options: BrokerOptions,
}

impl MqttBrokerBuilder {
    /// Sets the broker host. Required.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    /// Sets the broker port (default 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Sets the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the MQTT keep-alive (default 30 s).
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.options.keep_alive = keep_alive;
        self
    }

    /// Sets how long [`build`](Self::build) waits for the broker (default 10 s).
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.options.connection_timeout = timeout;
        self
    }

    /// Sets the pause between reconnect attempts (default 5 s).
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_delay = delay;
        self
    }

    /// Connects and waits for the broker to accept the session.
    ///
    /// The first connection is not retried: if it fails, so does this call.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` without a host, and
    /// `ProtocolError::ConnectionFailed` if the broker refuses or does not
    /// answer within the connection timeout.
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        let options = self.options;
        if options.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let (client, event_loop) = AsyncClient::new(options.mqtt_options(), REQUEST_CAPACITY);
        let broker = MqttBroker {
            inner: Arc::new(Shared {
                client,
                subscriptions: RwLock::new(HashMap::new()),
                options,
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
            }),
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let pump = EventPump {
            event_loop,
            broker: Arc::downgrade(&broker.inner),
            ready: Some(ready_tx),
            reconnect_delay: broker.inner.options.reconnect_delay,
        };
        tokio::spawn(pump.run());

        let timeout = broker.inner.options.connection_timeout;
        match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %broker.host(),
                    port = broker.port(),
                    "Connected to MQTT broker"
                );
                Ok(broker)
            }
            Ok(Ok(Err(reason))) => Err(ProtocolError::ConnectionFailed(reason)),
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "MQTT event loop stopped before connecting".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "no answer from MQTT broker within {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Owns the rumqttc event loop.
///
/// rumqttc reconnects on the next `poll` after an error, so the pump keeps
/// polling until the broker is closed or dropped.
struct EventPump {
    event_loop: EventLoop,
    broker: Weak<Shared>,
    /// Reports the outcome of the first connection attempt.
    ready: Option<oneshot::Sender<Result<(), String>>>,
    reconnect_delay: Duration,
}

impl EventPump {
    async fn run(mut self) {
        loop {
            let event = self.event_loop.poll().await;

            let Some(inner) = self.broker.upgrade() else {
                tracing::debug!("MQTT broker dropped, stopping event loop");
                break;
            };
            let broker = MqttBroker { inner };

            let (keep_going, failed) = match event {
                Ok(event) => (self.on_event(&broker, event).await, false),
                Err(e) => (self.on_error(&broker, &e), true),
            };
            drop(broker);

            if !keep_going {
                break;
            }
            if failed {
                tokio::time::sleep(self.reconnect_delay).await;
            }
        }
    }

    async fn on_event(&mut self, broker: &MqttBroker, event: Event) -> bool {
        match event {
            Event::Incoming(Packet::ConnAck(connack)) => {
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(ready) = self.ready.take() {
                    tracing::debug!(?connack, "MQTT session established");
                    let _ = ready.send(Ok(()));
                } else {
                    tracing::info!(host = %broker.host(), "Reconnected to MQTT broker");
                    broker.resubscribe().await;
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        tracing::debug!(topic = %publish.topic, payload = %payload, "Push received");
                        broker.deliver(&publish.topic, payload).await;
                    }
                    Err(_) => {
                        tracing::debug!(topic = %publish.topic, "Dropping non-UTF-8 payload");
                    }
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::warn!("MQTT broker closed the session");
                broker.inner.connected.store(false, Ordering::Release);
            }
            Event::Outgoing(Outgoing::Disconnect) if broker.inner.closing.load(Ordering::Acquire) => {
                return false;
            }
            _ => {}
        }
        true
    }

    /// Returns `false` when the pump should stop.
    fn on_error(&mut self, broker: &MqttBroker, error: &ConnectionError) -> bool {
        let was_connected = broker.inner.connected.swap(false, Ordering::AcqRel);

        if broker.inner.closing.load(Ordering::Acquire) {
            tracing::debug!(error = %error, "MQTT connection closed");
            return false;
        }

        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(error.to_string()));
            return false;
        }

        if was_connected {
            tracing::warn!(error = %error, "Lost MQTT broker connection, reconnecting");
        } else {
            tracing::debug!(error = %error, "MQTT reconnect attempt failed");
        }
        true
    }
}

/// Splits a broker URL into host and port.
fn parse_broker_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let rest = match url.trim().split_once("://") {
        Some(("mqtt" | "tcp", rest)) => rest,
        Some((scheme, _)) => {
            return Err(ProtocolError::InvalidAddress(format!(
                "unsupported MQTT scheme '{scheme}'"
            )));
        }
        None => url.trim(),
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| {
                ProtocolError::InvalidAddress(format!("invalid port '{port}' in '{url}'"))
            })?;
            (host, port)
        }
        None => (rest, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(ProtocolError::InvalidAddress(format!("no host in '{url}'")));
    }
    Ok((host.to_string(), port))
}
