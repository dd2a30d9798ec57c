// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only status sensors.

use std::fmt;

use crate::state::Snapshot;

use super::{Entity, EntityContext};

/// Which top-level status field a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// `cascade_mode`.
    CascadeMode,
    /// `device_status`.
    DeviceStatus,
}

impl SensorKind {
    /// Every sensor kind, in creation order.
    pub const ALL: [Self; 2] = [Self::CascadeMode, Self::DeviceStatus];

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CascadeMode => "Cascade Mode",
            Self::DeviceStatus => "Device Status",
        }
    }

    /// Returns the snapshot key (also the unique id suffix).
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::CascadeMode => "cascade_mode",
            Self::DeviceStatus => "device_status",
        }
    }

    fn read<'a>(&self, snapshot: &'a Snapshot) -> &'a str {
        match self {
            Self::CascadeMode => snapshot.cascade_mode(),
            Self::DeviceStatus => snapshot.device_status(),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reports one top-level status string.
#[derive(Debug, Clone)]
pub struct StatusSensor {
    context: EntityContext,
    kind: SensorKind,
    unique_id: String,
}

impl StatusSensor {
    /// Creates a sensor.
    #[must_use]
    pub fn new(context: EntityContext, kind: SensorKind) -> Self {
        let unique_id = format!("{}_{}", context.entry_id(), kind.key());
        Self {
            context,
            kind,
            unique_id,
        }
    }

    /// Returns the sensor kind.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Returns the reported value, `"Unknown"` when the field is missing.
    ///
    /// `None` while the entity is unavailable.
    #[must_use]
    pub fn state(&self) -> Option<String> {
        if !self.available() {
            return None;
        }
        let snapshot = self.context.sync().current_snapshot();
        Some(self.kind.read(&snapshot).to_string())
    }
}

impl Entity for StatusSensor {
    fn context(&self) -> &EntityContext {
        &self.context
    }

    fn name(&self) -> &str {
        self.kind.name()
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}
