// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EDID preset index type.
//!
//! The switcher stores a table of EDID presets and each input is assigned
//! one of them by index.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// EDID preset index assigned to an input (0-16).
///
/// # Examples
///
/// ```
/// use ez_matrix::types::EdidIndex;
///
/// let idx: EdidIndex = "7".parse().unwrap();
/// assert_eq!(idx.value(), 7);
///
/// assert!(EdidIndex::new(17).is_err());
/// assert_eq!(EdidIndex::options().len(), 17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EdidIndex(u8);

impl EdidIndex {
    /// Lowest preset index.
    pub const MIN: Self = Self(0);

    /// Highest preset index.
    pub const MAX: Self = Self(16);

    /// Creates an EDID index.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 16.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > Self::MAX.0 {
            return Err(ValueError::OutOfRange {
                min: Self::MIN.0,
                max: Self::MAX.0,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Returns the index value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the selector options `"0"` through `"16"`.
    #[must_use]
    pub fn options() -> Vec<String> {
        (Self::MIN.0..=Self::MAX.0).map(|i| i.to_string()).collect()
    }
}

impl fmt::Display for EdidIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EdidIndex {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValueError::InvalidOption(s.to_string()))?;
        u8::try_from(value)
            .ok()
            .and_then(|v| Self::new(v).ok())
            .ok_or(ValueError::OutOfRange {
                min: Self::MIN.0,
                max: Self::MAX.0,
                actual: value,
            })
    }
}
