// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for matrix switcher control.
//!
//! Each type checks its range at construction time, so commands built from
//! them are always valid for the device.
//!
//! # Types
//!
//! - [`OutputPort`] - Video output (1-2)
//! - [`InputPort`] - Video input (1-4)
//! - [`InputSource`] - Output selector option (`Input 1` - `Input 4`)
//! - [`EdidIndex`] - EDID preset index (0-16)

mod edid_index;
mod input_source;
mod port;

pub use edid_index::EdidIndex;
pub use input_source::InputSource;
pub use port::{InputPort, OutputPort};
