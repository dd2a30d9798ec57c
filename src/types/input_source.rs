// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source options for an output selector.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

use super::InputPort;

/// The input routed to an output, as shown in the output selector.
///
/// The device reports the current source as a label (`"Input 3"`), and the
/// selector offers exactly the four labels in [`InputSource::OPTIONS`].
///
/// # Examples
///
/// ```
/// use ez_matrix::types::InputSource;
///
/// let source: InputSource = "Input 3".parse().unwrap();
/// assert_eq!(source.input_number(), 3);
/// assert_eq!(source.label(), "Input 3");
///
/// assert!("Input 9".parse::<InputSource>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// HDMI input 1.
    Input1,
    /// HDMI input 2.
    Input2,
    /// HDMI input 3.
    Input3,
    /// HDMI input 4.
    Input4,
}

impl InputSource {
    /// The option labels offered by an output selector, in display order.
    pub const OPTIONS: [&'static str; 4] = ["Input 1", "Input 2", "Input 3", "Input 4"];

    /// Returns the option label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Input1 => "Input 1",
            Self::Input2 => "Input 2",
            Self::Input3 => "Input 3",
            Self::Input4 => "Input 4",
        }
    }

    /// Returns the 1-based input number sent to the device.
    #[must_use]
    pub const fn input_number(&self) -> u8 {
        match self {
            Self::Input1 => 1,
            Self::Input2 => 2,
            Self::Input3 => 3,
            Self::Input4 => 4,
        }
    }

    /// Returns the source for an input port.
    #[must_use]
    pub const fn from_port(port: InputPort) -> Self {
        match port.number() {
            1 => Self::Input1,
            2 => Self::Input2,
            3 => Self::Input3,
            _ => Self::Input4,
        }
    }

    /// Matches a label reported by the device.
    ///
    /// Only exact option labels match; anything else (including
    /// `"Input 9"` or `"Unknown"`) yields `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Input 1" => Some(Self::Input1),
            "Input 2" => Some(Self::Input2),
            "Input 3" => Some(Self::Input3),
            "Input 4" => Some(Self::Input4),
            _ => None,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InputSource {
    type Err = ValueError;

    /// Parses one of the [`InputSource::OPTIONS`] labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| ValueError::InvalidOption(s.to_string()))
    }
}
