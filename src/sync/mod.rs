// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State synchronization.
//!
//! The device state reaches the bridge along two independent paths:
//!
//! - **pull**: a fixed-interval `GET /status` through a [`StatusSource`]
//! - **push**: JSON messages carrying `current_state`, decoded by [`parse_push`]
//!
//! [`StateSynchronizer`] merges both into one published [`SyncState`](crate::state::SyncState).

mod push;
mod synchronizer;

pub use push::{CURRENT_STATE_KEY, parse_push};
pub use synchronizer::StateSynchronizer;

use std::future::Future;
use std::time::Duration;

use crate::error::Error;
use crate::state::Snapshot;

/// Topic on which the device publishes push updates.
pub const STATUS_TOPIC: &str = "serial/status";

/// Something that can fetch a full device snapshot.
///
/// [`HttpClient`](crate::protocol::HttpClient) implements this with
/// `GET /status`.
pub trait StatusSource: Send + Sync + 'static {
    /// Fetches the current device state.
    ///
    /// # Errors
    ///
    /// Returns error if the state cannot be fetched or decoded.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, Error>> + Send;
}

/// Timing and queueing parameters for the synchronizer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    poll_interval: Duration,
    push_capacity: usize,
}

impl SyncConfig {
    /// Default time between scheduled polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    /// Default number of push payloads buffered ahead of the task.
    pub const DEFAULT_PUSH_CAPACITY: usize = 32;

    /// Sets the poll interval (minimum 1 ms).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the push queue capacity (minimum 1).
    #[must_use]
    pub fn with_push_capacity(mut self, capacity: usize) -> Self {
        self.push_capacity = capacity.max(1);
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the push queue capacity.
    #[must_use]
    pub fn push_capacity(&self) -> usize {
        self.push_capacity
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            push_capacity: Self::DEFAULT_PUSH_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.push_capacity(), 32);
    }

    #[test]
    fn push_capacity_is_at_least_one() {
        let config = SyncConfig::default().with_push_capacity(0);
        assert_eq!(config.push_capacity(), 1);
    }
}
