// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical port numbers on the matrix switcher.

use std::fmt;

use crate::error::ValueError;

/// A video output of the matrix (1-2).
///
/// # Examples
///
/// ```
/// use ez_matrix::types::OutputPort;
///
/// let out = OutputPort::new(2).unwrap();
/// assert_eq!(out.number(), 2);
/// assert!(OutputPort::new(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputPort(u8);

impl OutputPort {
    /// Number of outputs on the device.
    pub const COUNT: u8 = 2;

    /// Creates an output port.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` unless `number` is 1 or 2.
    pub fn new(number: u8) -> Result<Self, ValueError> {
        if number == 0 || number > Self::COUNT {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: Self::COUNT,
                actual: i64::from(number),
            });
        }
        Ok(Self(number))
    }

    /// Returns every output port in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::COUNT).map(Self)
    }

    /// Returns the 1-based output number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output {}", self.0)
    }
}

/// A video input of the matrix (1-4).
///
/// # Examples
///
/// ```
/// use ez_matrix::types::InputPort;
///
/// assert_eq!(InputPort::all().count(), 4);
/// assert!(InputPort::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputPort(u8);

impl InputPort {
    /// Number of inputs on the device.
    pub const COUNT: u8 = 4;

    /// Creates an input port.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` unless `number` is in 1-4.
    pub fn new(number: u8) -> Result<Self, ValueError> {
        if number == 0 || number > Self::COUNT {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: Self::COUNT,
                actual: i64::from(number),
            });
        }
        Ok(Self(number))
    }

    /// Returns every input port in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::COUNT).map(Self)
    }

    /// Returns the 1-based input number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input {}", self.0)
    }
}
