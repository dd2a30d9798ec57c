// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ez_matrix` - bridge for EZ Matrix HDMI matrix switchers.
//!
//! The switcher exposes a small REST API and, through a serial-to-MQTT
//! bridge, publishes its full state whenever it changes. This crate keeps
//! one in-memory snapshot of that state up to date from both sources and
//! offers typed controls on top of it.
//!
//! # Features
//!
//! - **State synchronization**: 30 s REST polling plus MQTT push, merged
//!   by a single background task
//! - **Output routing**: pick which of the 4 inputs feeds each of the 2
//!   outputs
//! - **EDID management**: assign one of 17 EDID presets to each input
//! - **Status sensors**: cascade mode and device status
//!
//! # Quick Start
//!
//! ```no_run
//! use ez_matrix::integration::{ConfigEntry, MatrixIntegration};
//! use ez_matrix::protocol::MqttBroker;
//!
//! #[tokio::main]
//! async fn main() -> ez_matrix::Result<()> {
//!     let broker = MqttBroker::builder().host("192.168.1.10").build().await?;
//!     let entry = ConfigEntry::new("http://192.168.1.100:8000");
//!
//!     // Fails unless the first poll of /status succeeds.
//!     let matrix = MatrixIntegration::setup(&entry, &broker).await?;
//!
//!     for select in matrix.output_selects() {
//!         println!("{:?}", select.current_option());
//!     }
//!
//!     // The new routing shows up after the follow-up refresh.
//!     matrix.select_output(2, "Input 4").await?;
//!
//!     matrix.unload().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Without MQTT
//!
//! ```no_run
//! use ez_matrix::protocol::HttpClient;
//! use ez_matrix::sync::{StateSynchronizer, SyncConfig};
//!
//! # async fn example() -> ez_matrix::Result<()> {
//! let client = HttpClient::new("192.168.1.100:8000")?;
//! let sync = StateSynchronizer::start(client, SyncConfig::default()).await?;
//!
//! println!("{}", sync.current_snapshot().device_status());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod entity;
pub mod error;
pub mod integration;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod types;

pub use command::{Command, EdidSetCommand, OutputSwitchCommand};
pub use entity::{
    CommandOutcome, DeviceInfo, EdidSelect, Entity, EntityContext, OutputSelect, SensorKind,
    StatusSensor,
};
pub use error::{ConfigError, Error, ParseError, ProtocolError, Result, ValueError};
#[cfg(feature = "mqtt")]
pub use integration::MatrixIntegration;
pub use integration::{BridgeConfig, ConfigEntry, ConfigFlow};
pub use protocol::{HttpClient, HttpConfig};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder};
pub use state::{Snapshot, SyncState, UpdateSource};
pub use sync::{StateSynchronizer, StatusSource, SyncConfig};
pub use types::{EdidIndex, InputPort, InputSource, OutputPort};
