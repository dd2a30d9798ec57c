// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EDID assignment command.

use serde::Serialize;

use crate::command::Command;
use crate::types::{EdidIndex, InputPort};

/// Assigns an EDID preset to an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdidSetCommand {
    input_number: u8,
    edid_index: u8,
}

impl EdidSetCommand {
    /// Creates a command assigning `index` to `input`.
    #[must_use]
    pub fn new(input: InputPort, index: EdidIndex) -> Self {
        Self {
            input_number: input.number(),
            edid_index: index.value(),
        }
    }
}

impl Command for EdidSetCommand {
    fn path(&self) -> &'static str {
        "/edid/set"
    }
}
