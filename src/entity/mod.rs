// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entities exposed to the automation host.
//!
//! Every entity holds an [`EntityContext`]: an explicit handle to the
//! [`StateSynchronizer`] it reads from and the [`HttpClient`] it sends
//! commands through. Nothing is cached per entity; each read goes to the
//! synchronizer's current snapshot.
//!
//! | Entity | Reads | Writes |
//! |--------|-------|--------|
//! | [`StatusSensor`] | `cascade_mode` / `device_status` | - |
//! | [`OutputSelect`] | `outputs.output_<N>_source` | `POST /output/switch` |
//! | [`EdidSelect`] | `inputs_edid_index.input_<N>_edid_index` | `POST /edid/set` |
//!
//! Selectors never update the snapshot themselves. A command accepted by
//! the device (HTTP 200) triggers an immediate refresh, and the new value
//! appears once that refresh lands.

mod select;
mod sensor;

pub use select::{EdidSelect, OutputSelect};
pub use sensor::{SensorKind, StatusSensor};

use serde::Serialize;

use crate::command::Command;
use crate::protocol::HttpClient;
use crate::sync::StateSynchronizer;

/// Integration domain, used in device identifiers.
pub const DOMAIN: &str = "ez_matrix";

/// Device metadata shared by all entities of one config entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, entry_id)` pair identifying the device.
    pub identifiers: (String, String),
    /// Display name.
    pub name: String,
    /// Manufacturer.
    pub manufacturer: String,
    /// Model.
    pub model: String,
    /// Firmware version.
    pub sw_version: String,
    /// Device web UI.
    pub configuration_url: String,
}

/// Outcome of a control command.
///
/// Failures are logged where they happen; this value only tells the
/// caller what was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device answered HTTP 200 and a refresh was requested.
    Accepted,
    /// The device answered with another status code.
    Rejected {
        /// The HTTP status code.
        status: u16,
    },
    /// The request could not be sent.
    Failed(String),
}

impl CommandOutcome {
    /// Returns `true` if the device accepted the command.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Shared dependencies of the entities of one config entry.
#[derive(Debug, Clone)]
pub struct EntityContext {
    entry_id: String,
    sync: StateSynchronizer,
    client: HttpClient,
}

impl EntityContext {
    /// Creates a context.
    #[must_use]
    pub fn new(entry_id: impl Into<String>, sync: StateSynchronizer, client: HttpClient) -> Self {
        Self {
            entry_id: entry_id.into(),
            sync,
            client,
        }
    }

    /// Returns the config entry id.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Returns the synchronizer.
    #[must_use]
    pub fn sync(&self) -> &StateSynchronizer {
        &self.sync
    }

    /// Returns the HTTP client.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Returns the device metadata.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: (DOMAIN.to_string(), self.entry_id.clone()),
            name: "EZ Matrix Controller".to_string(),
            manufacturer: "Custom DIY".to_string(),
            model: "Serial MQTT Matrix".to_string(),
            sw_version: "1.2.0".to_string(),
            configuration_url: self.client.base_url().to_string(),
        }
    }

    /// Sends a command and refreshes the state if the device accepted it.
    pub(crate) async fn dispatch<C: Command + Sync>(&self, command: &C) -> CommandOutcome {
        match self.client.send_command(command).await {
            Ok(response) if response.is_accepted() => {
                if let Err(e) = self.sync.request_refresh().await {
                    tracing::warn!(error = %e, "Refresh after command failed");
                }
                CommandOutcome::Accepted
            }
            Ok(response) => {
                tracing::error!(
                    path = command.path(),
                    status = response.status(),
                    "Device rejected command"
                );
                CommandOutcome::Rejected {
                    status: response.status(),
                }
            }
            Err(e) => {
                tracing::error!(path = command.path(), error = %e, "Error sending command");
                CommandOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Common surface of every entity.
pub trait Entity {
    /// Returns the context the entity reads from.
    fn context(&self) -> &EntityContext;

    /// Returns the display name.
    fn name(&self) -> &str;

    /// Returns the unique id, prefixed by the config entry id.
    fn unique_id(&self) -> &str;

    /// Returns `false` while the synchronizer's last update failed.
    fn available(&self) -> bool {
        self.context().sync().is_available()
    }

    /// Returns the device metadata.
    fn device_info(&self) -> DeviceInfo {
        self.context().device_info()
    }
}
