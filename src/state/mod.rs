// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state types.
//!
//! [`Snapshot`] holds the last-known device state as reported by the
//! switcher. [`SyncState`] wraps it with the bookkeeping the synchronizer
//! keeps about where it came from and whether the last update succeeded.
//!
//! # Examples
//!
//! ```
//! use ez_matrix::state::Snapshot;
//! use ez_matrix::types::InputPort;
//!
//! let snapshot = Snapshot::from_json(
//!     r#"{"inputs_edid_index": {"input_2_edid_index": 7}}"#,
//! ).unwrap();
//!
//! assert_eq!(snapshot.edid_index(InputPort::new(2).unwrap()), "7");
//! ```

mod snapshot;
mod sync_state;

pub use snapshot::{DEFAULT_EDID_INDEX, Snapshot, UNKNOWN};
pub use sync_state::{SyncState, UpdateSource};
