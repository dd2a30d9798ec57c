// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output routing command.

use serde::Serialize;

use crate::command::Command;
use crate::types::{InputSource, OutputPort};

/// Routes an input to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputSwitchCommand {
    output_number: u8,
    input_number: u8,
}

impl OutputSwitchCommand {
    /// Creates a command routing `source` to `output`.
    #[must_use]
    pub fn new(output: OutputPort, source: InputSource) -> Self {
        Self {
            output_number: output.number(),
            input_number: source.input_number(),
        }
    }

    /// Returns the target output number.
    #[must_use]
    pub fn output_number(&self) -> u8 {
        self.output_number
    }

    /// Returns the input number to route.
    #[must_use]
    pub fn input_number(&self) -> u8 {
        self.input_number
    }
}

impl Command for OutputSwitchCommand {
    fn path(&self) -> &'static str {
        "/output/switch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_integer_fields() {
        let cmd = OutputSwitchCommand::new(OutputPort::new(2).unwrap(), InputSource::Input4);
        assert_eq!(
            cmd.body().unwrap(),
            serde_json::json!({"output_number": 2, "input_number": 4})
        );
    }

    #[test]
    fn accessors() {
        let cmd = OutputSwitchCommand::new(OutputPort::new(1).unwrap(), InputSource::Input2);
        assert_eq!(cmd.output_number(), 1);
        assert_eq!(cmd.input_number(), 2);
    }
}
