// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output source and EDID index selectors.

use crate::command::{EdidSetCommand, OutputSwitchCommand};
use crate::error::ValueError;
use crate::types::{EdidIndex, InputPort, InputSource, OutputPort};

use super::{CommandOutcome, Entity, EntityContext};

/// Selects which input is routed to one output.
#[derive(Debug, Clone)]
pub struct OutputSelect {
    context: EntityContext,
    output: OutputPort,
    name: String,
    unique_id: String,
}

impl OutputSelect {
    /// Creates the selector for `output`.
    #[must_use]
    pub fn new(context: EntityContext, output: OutputPort) -> Self {
        let n = output.number();
        let name = format!("Output {n} Source");
        let unique_id = format!("{}_output_{n}_source", context.entry_id());
        Self {
            context,
            output,
            name,
            unique_id,
        }
    }

    /// Returns the controlled output.
    #[must_use]
    pub fn output(&self) -> OutputPort {
        self.output
    }

    /// Returns the option labels.
    #[must_use]
    pub fn options(&self) -> &'static [&'static str] {
        &InputSource::OPTIONS
    }

    /// Returns the source currently reported by the device.
    ///
    /// `None` when the reported label is missing or is not one of the
    /// options.
    #[must_use]
    pub fn current_option(&self) -> Option<InputSource> {
        InputSource::from_label(self.context.sync().current_snapshot().output_source(self.output))
    }

    /// Routes the input named by `option` to this output.
    ///
    /// The displayed value only changes once the follow-up refresh
    /// reports the new routing.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidOption` if `option` does not name an
    /// input. No request is sent in that case.
    pub async fn select_option(&self, option: &str) -> Result<CommandOutcome, ValueError> {
        let source: InputSource = option.parse()?;
        let command = OutputSwitchCommand::new(self.output, source);

        tracing::debug!(
            output = self.output.number(),
            input = source.input_number(),
            "Switching output source"
        );
        Ok(self.context.dispatch(&command).await)
    }
}

impl Entity for OutputSelect {
    fn context(&self) -> &EntityContext {
        &self.context
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

/// Selects the EDID preset assigned to one input.
#[derive(Debug, Clone)]
pub struct EdidSelect {
    context: EntityContext,
    input: InputPort,
    name: String,
    unique_id: String,
}

impl EdidSelect {
    /// Creates the selector for `input`.
    #[must_use]
    pub fn new(context: EntityContext, input: InputPort) -> Self {
        let n = input.number();
        let name = format!("Input {n} EDID Index");
        let unique_id = format!("{}_input_{n}_edid", context.entry_id());
        Self {
            context,
            input,
            name,
            unique_id,
        }
    }

    /// Returns the controlled input.
    #[must_use]
    pub fn input(&self) -> InputPort {
        self.input
    }

    /// Returns the options `"0"` through `"16"`.
    #[must_use]
    pub fn options(&self) -> Vec<String> {
        EdidIndex::options()
    }

    /// Returns the index currently reported by the device, `"0"` when
    /// missing.
    #[must_use]
    pub fn current_option(&self) -> String {
        self.context.sync().current_snapshot().edid_index(self.input)
    }

    /// Assigns the EDID preset named by `option` to this input.
    ///
    /// # Errors
    ///
    /// Returns `ValueError` if `option` is not an integer in 0-16. No
    /// request is sent in that case.
    pub async fn select_option(&self, option: &str) -> Result<CommandOutcome, ValueError> {
        let index: EdidIndex = option.parse()?;
        let command = EdidSetCommand::new(self.input, index);

        tracing::debug!(
            input = self.input.number(),
            edid_index = index.value(),
            "Setting EDID index"
        );
        Ok(self.context.dispatch(&command).await)
    }
}

impl Entity for EdidSelect {
    fn context(&self) -> &EntityContext {
        &self.context
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}
