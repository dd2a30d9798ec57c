// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Published synchronizer state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Snapshot;

/// Which update path produced the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateSource {
    /// The synchronous fetch performed during setup.
    FirstRefresh,
    /// A scheduled poll of `/status`.
    Poll,
    /// An out-of-band refresh requested by a caller.
    Refresh,
    /// A message on the push topic.
    Push,
}

/// State published by the synchronizer after every update attempt.
///
/// The snapshot is kept when a poll fails, but dependents should treat the
/// device as unavailable until [`last_update_success`](Self::last_update_success)
/// is `true` again.
#[derive(Debug, Clone)]
pub struct SyncState {
    snapshot: Arc<Snapshot>,
    last_update_success: bool,
    last_error: Option<String>,
    last_updated: DateTime<Utc>,
    source: UpdateSource,
}

impl SyncState {
    pub(crate) fn new(snapshot: Snapshot, source: UpdateSource) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            last_update_success: true,
            last_error: None,
            last_updated: Utc::now(),
            source,
        }
    }

    /// Replaces the snapshot wholesale and marks the update successful.
    pub(crate) fn replace(&mut self, snapshot: Snapshot, source: UpdateSource) {
        self.snapshot = Arc::new(snapshot);
        self.last_update_success = true;
        self.last_error = None;
        self.last_updated = Utc::now();
        self.source = source;
    }

    /// Records a failed update, keeping the previous snapshot.
    pub(crate) fn fail(&mut self, error: String) {
        self.last_update_success = false;
        self.last_error = Some(error);
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Returns `true` if the most recent update attempt succeeded.
    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    /// Returns the error of the most recent failed update, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns when the snapshot was last replaced.
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Returns the update path that produced the snapshot.
    #[must_use]
    pub fn source(&self) -> UpdateSource {
        self.source
    }
}
