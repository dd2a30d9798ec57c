// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The state synchronizer task.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::state::{Snapshot, SyncState, UpdateSource};

use super::{StatusSource, SyncConfig, parse_push};

/// Reply channel for an out-of-band refresh.
type RefreshReply = oneshot::Sender<std::result::Result<(), String>>;

/// Owner of the device snapshot.
///
/// The snapshot is written by a single background task that multiplexes
/// three inputs:
///
/// - a fixed-interval poll of the [`StatusSource`],
/// - push payloads queued through [`push_sender`](Self::push_sender) or
///   [`on_push`](Self::on_push),
/// - refresh requests from [`request_refresh`](Self::request_refresh).
///
/// Every completed update replaces the snapshot wholesale. Poll and push
/// results are applied in the order the task completes them, so a push
/// can be overwritten by the next poll and a slow poll can overwrite a
/// push that arrived while it was in flight. Last write wins.
///
/// Readers get the latest published state through a `watch` channel and
/// never wait on the writer.
///
/// `StateSynchronizer` is cheaply cloneable; clones share the same task.
///
/// # Examples
///
/// ```no_run
/// use ez_matrix::protocol::HttpClient;
/// use ez_matrix::sync::{StateSynchronizer, SyncConfig};
///
/// # async fn example() -> ez_matrix::Result<()> {
/// let client = HttpClient::new("http://192.168.1.100:8000")?;
///
/// // Fails if the first fetch fails.
/// let sync = StateSynchronizer::start(client, SyncConfig::default()).await?;
///
/// println!("status: {}", sync.current_snapshot().device_status());
///
/// sync.on_push(r#"{"current_state": {"cascade_mode": "Auto"}}"#).await?;
/// sync.request_refresh().await?;
/// sync.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StateSynchronizer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state_rx: watch::Receiver<SyncState>,
    refresh_tx: mpsc::Sender<RefreshReply>,
    push_tx: mpsc::Sender<String>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

impl StateSynchronizer {
    /// Performs the first fetch and starts the background task.
    ///
    /// Nothing is spawned unless the first fetch succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpdateFailed` if the first fetch fails.
    pub async fn start<S: StatusSource>(source: S, config: SyncConfig) -> Result<Self> {
        let snapshot = source.fetch().await.map_err(|e| {
            tracing::error!(error = %e, "First refresh failed");
            Error::UpdateFailed(format!("Error communicating with API: {e}"))
        })?;

        tracing::debug!(keys = snapshot.as_map().len(), "First refresh succeeded");

        let (state_tx, state_rx) =
            watch::channel(SyncState::new(snapshot, UpdateSource::FirstRefresh));
        let (refresh_tx, refresh_rx) = mpsc::channel(8);
        let (push_tx, push_rx) = mpsc::channel(config.push_capacity());

        let worker = Worker {
            source,
            state_tx,
            config,
        };
        let task = tokio::spawn(worker.run(push_rx, refresh_rx));

        Ok(Self {
            inner: Arc::new(Inner {
                state_rx,
                refresh_tx,
                push_tx,
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.inner.state_rx.borrow().snapshot()
    }

    /// Returns a copy of the latest published state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.inner.state_rx.borrow().clone()
    }

    /// Returns `true` if the most recent update succeeded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.state_rx.borrow().last_update_success()
    }

    /// Returns a receiver notified after every update attempt.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state_rx.clone()
    }

    /// Returns the sender feeding the push queue.
    ///
    /// Hand this to a transport (such as an MQTT subscription) that
    /// delivers raw push payloads.
    #[must_use]
    pub fn push_sender(&self) -> mpsc::Sender<String> {
        self.inner.push_tx.clone()
    }

    /// Queues a push payload.
    ///
    /// Malformed payloads are logged and dropped by the task; they never
    /// surface here.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` if the task has stopped.
    pub async fn on_push(&self, payload: impl Into<String>) -> Result<()> {
        self.inner
            .push_tx
            .send(payload.into())
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Polls the device now and waits for the result to be applied.
    ///
    /// The next scheduled poll is pushed back a full interval.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpdateFailed` if the fetch failed, or
    /// `Error::NotConnected` if the task has stopped.
    pub async fn request_refresh(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .refresh_tx
            .send(reply_tx)
            .await
            .map_err(|_| Error::NotConnected)?;

        reply_rx
            .await
            .map_err(|_| Error::NotConnected)?
            .map_err(Error::UpdateFailed)
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops polling and push handling.
    ///
    /// An in-flight fetch is abandoned. The last published state stays
    /// readable.
    pub fn shutdown(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
            tracing::debug!("State synchronizer stopped");
        }
    }
}

/// The single writer of the published state.
struct Worker<S> {
    source: S,
    state_tx: watch::Sender<SyncState>,
    config: SyncConfig,
}

impl<S: StatusSource> Worker<S> {
    async fn run(
        self,
        mut push_rx: mpsc::Receiver<String>,
        mut refresh_rx: mpsc::Receiver<RefreshReply>,
    ) {
        let period = self.config.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.refresh(UpdateSource::Poll).await;
                }
                Some(reply) = refresh_rx.recv() => {
                    let result = self.refresh(UpdateSource::Refresh).await;
                    ticker.reset();
                    let _ = reply.send(result);
                }
                Some(payload) = push_rx.recv() => {
                    self.apply_push(&payload);
                }
            }
        }
    }

    async fn refresh(&self, source: UpdateSource) -> std::result::Result<(), String> {
        match self.source.fetch().await {
            Ok(snapshot) => {
                let recovered = !self.state_tx.borrow().last_update_success();
                self.state_tx
                    .send_modify(|state| state.replace(snapshot, source));

                if recovered {
                    tracing::info!("Fetching device status recovered");
                } else {
                    tracing::debug!(?source, "Device status updated");
                }
                Ok(())
            }
            Err(e) => {
                let message = format!("Error communicating with API: {e}");

                // Log once per outage.
                if self.state_tx.borrow().last_update_success() {
                    tracing::error!(error = %e, ?source, "Error fetching device status");
                } else {
                    tracing::debug!(error = %e, ?source, "Device status still unavailable");
                }

                self.state_tx.send_modify(|state| state.fail(message.clone()));
                Err(message)
            }
        }
    }

    fn apply_push(&self, payload: &str) {
        match parse_push(payload) {
            Ok(snapshot) => {
                tracing::debug!(keys = snapshot.as_map().len(), "Updated state via push");
                self.state_tx
                    .send_modify(|state| state.replace(snapshot, UpdateSource::Push));
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing push message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::error::ProtocolError;

    /// Replays scripted fetch results; `None` is a failure. The last entry
    /// repeats once the script runs out.
    struct ScriptedSource {
        script: parking_lot::Mutex<VecDeque<Option<Snapshot>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<Snapshot>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                script: parking_lot::Mutex::new(script.into()),
                calls: Arc::clone(&calls),
            };
            (source, calls)
        }
    }

    impl StatusSource for ScriptedSource {
        async fn fetch(&self) -> Result<Snapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock();
                if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().cloned().flatten()
                }
            };
            next.ok_or_else(|| {
                Error::Protocol(ProtocolError::ConnectionFailed(
                    "connection refused".to_string(),
                ))
            })
        }
    }

    fn status(device_status: &str) -> Snapshot {
        Snapshot::from_value(serde_json::json!({
            "device_status": device_status,
            "cascade_mode": "Off",
            "outputs": {"output_1_source": "Input 1"}
        }))
        .unwrap()
    }

    fn worker(snapshot: Snapshot) -> (Worker<ScriptedSource>, watch::Receiver<SyncState>) {
        let (source, _) = ScriptedSource::new(vec![Some(snapshot.clone())]);
        let (state_tx, state_rx) =
            watch::channel(SyncState::new(snapshot, UpdateSource::FirstRefresh));
        let worker = Worker {
            source,
            state_tx,
            config: SyncConfig::default(),
        };
        (worker, state_rx)
    }

    #[tokio::test]
    async fn start_fails_when_first_fetch_fails() {
        let (source, calls) = ScriptedSource::new(vec![None]);
        let result = StateSynchronizer::start(source, SyncConfig::default()).await;

        assert!(matches!(result, Err(Error::UpdateFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_publishes_first_snapshot() {
        let (source, _) = ScriptedSource::new(vec![Some(status("OK"))]);
        let sync = StateSynchronizer::start(source, SyncConfig::default())
            .await
            .unwrap();

        assert!(sync.is_available());
        assert!(sync.is_running());
        assert_eq!(sync.current_snapshot().device_status(), "OK");
        assert_eq!(sync.state().source(), UpdateSource::FirstRefresh);
    }

    #[test]
    fn push_replaces_snapshot_wholesale() {
        let (worker, state_rx) = worker(status("OK"));

        worker.apply_push(r#"{"current_state": {"cascade_mode": "Auto"}}"#);

        let state = state_rx.borrow();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.cascade_mode(), "Auto");
        // Keys missing from the push fall back to defaults.
        assert_eq!(snapshot.device_status(), "Unknown");
        assert!(snapshot.get("outputs").is_none());
        assert_eq!(state.source(), UpdateSource::Push);
    }

    #[test]
    fn malformed_push_is_inert() {
        let (worker, state_rx) = worker(status("OK"));

        worker.apply_push("definitely not json");
        worker.apply_push(r#"{"state": {"cascade_mode": "Auto"}}"#);
        worker.apply_push(r#"{"current_state": "Auto"}"#);

        let state = state_rx.borrow();
        assert_eq!(state.snapshot().device_status(), "OK");
        assert_eq!(state.snapshot().cascade_mode(), "Off");
        assert_eq!(state.source(), UpdateSource::FirstRefresh);
        assert!(state.last_update_success());
    }

    #[tokio::test]
    async fn push_through_queue_is_applied() {
        let (source, _) = ScriptedSource::new(vec![Some(status("OK"))]);
        let sync = StateSynchronizer::start(source, SyncConfig::default())
            .await
            .unwrap();
        let mut rx = sync.subscribe();

        sync.on_push(r#"{"current_state": {"device_status": "Busy"}}"#)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sync.current_snapshot().device_status(), "Busy");
    }

    #[tokio::test]
    async fn request_refresh_applies_new_snapshot() {
        let (source, calls) = ScriptedSource::new(vec![Some(status("OK")), Some(status("Busy"))]);
        let sync = StateSynchronizer::start(source, SyncConfig::default())
            .await
            .unwrap();

        sync.request_refresh().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sync.current_snapshot().device_status(), "Busy");
        assert_eq!(sync.state().source(), UpdateSource::Refresh);
    }

    #[tokio::test]
    async fn failed_refresh_marks_unavailable_and_keeps_snapshot() {
        let (source, _) = ScriptedSource::new(vec![Some(status("OK")), None, Some(status("Back"))]);
        let sync = StateSynchronizer::start(source, SyncConfig::default())
            .await
            .unwrap();

        let result = sync.request_refresh().await;
        assert!(matches!(result, Err(Error::UpdateFailed(_))));
        assert!(!sync.is_available());
        assert!(sync.state().last_error().is_some());
        assert_eq!(sync.current_snapshot().device_status(), "OK");

        sync.request_refresh().await.unwrap();
        assert!(sync.is_available());
        assert_eq!(sync.current_snapshot().device_status(), "Back");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_fixed_interval() {
        let (source, calls) = ScriptedSource::new(vec![Some(status("OK")), Some(status("Polled"))]);
        let config = SyncConfig::default().with_poll_interval(Duration::from_secs(30));
        let sync = StateSynchronizer::start(source, config).await.unwrap();
        let mut rx = sync.subscribe();

        tokio::time::timeout(Duration::from_secs(31), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sync.state().source(), UpdateSource::Poll);
        assert_eq!(sync.current_snapshot().device_status(), "Polled");
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_pushes_back_next_poll() {
        let (source, calls) = ScriptedSource::new(vec![Some(status("OK"))]);
        let config = SyncConfig::default().with_poll_interval(Duration::from_secs(30));
        let sync = StateSynchronizer::start(source, config).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        sync.request_refresh().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_does_not_stop_polling() {
        let (source, calls) =
            ScriptedSource::new(vec![Some(status("OK")), None, None, Some(status("Back"))]);
        let config = SyncConfig::default().with_poll_interval(Duration::from_secs(30));
        let sync = StateSynchronizer::start(source, config).await.unwrap();

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(!sync.is_available());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(sync.is_available());
        assert_eq!(sync.current_snapshot().device_status(), "Back");
    }

    #[tokio::test]
    async fn shutdown_stops_the_task() {
        let (source, _) = ScriptedSource::new(vec![Some(status("OK"))]);
        let sync = StateSynchronizer::start(source, SyncConfig::default())
            .await
            .unwrap();

        sync.shutdown();
        assert!(!sync.is_running());

        let result = sync.request_refresh().await;
        assert!(matches!(result, Err(Error::NotConnected)));
        // The last state stays readable.
        assert_eq!(sync.current_snapshot().device_status(), "OK");
    }
}
