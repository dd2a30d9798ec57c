// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports for talking to the matrix switcher.
//!
//! - [`HttpClient`]: REST polling (`GET /status`) and commands (`POST`)
//! - [`MqttBroker`]: push updates published by the device's serial bridge

mod http;
#[cfg(feature = "mqtt")]
mod mqtt_broker;

pub use http::{CommandResponse, HttpClient, HttpConfig};
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};
