// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matrix switcher command definitions.
//!
//! Commands are JSON bodies POSTed to an endpoint below the device's base
//! URL. The device answers HTTP 200 when it accepted the change.
//!
//! # Available Commands
//!
//! | Command Type | Endpoint | Body |
//! |-------------|----------|------|
//! | [`OutputSwitchCommand`] | `/output/switch` | `{output_number, input_number}` |
//! | [`EdidSetCommand`] | `/edid/set` | `{input_number, edid_index}` |
//!
//! # Examples
//!
//! ```
//! use ez_matrix::command::{Command, OutputSwitchCommand};
//! use ez_matrix::types::{InputSource, OutputPort};
//!
//! let cmd = OutputSwitchCommand::new(OutputPort::new(1).unwrap(), InputSource::Input3);
//!
//! assert_eq!(cmd.path(), "/output/switch");
//! assert_eq!(
//!     cmd.body().unwrap(),
//!     serde_json::json!({"output_number": 1, "input_number": 3})
//! );
//! ```

mod edid;
mod output;

pub use edid::EdidSetCommand;
pub use output::OutputSwitchCommand;

use serde::Serialize;

/// A command that can be sent to the matrix switcher.
pub trait Command: Serialize {
    /// Returns the endpoint path, starting with `/`.
    fn path(&self) -> &'static str;

    /// Returns the JSON body for this command.
    ///
    /// # Errors
    ///
    /// Returns error if the command cannot be serialized.
    fn body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
