// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Config entries, the setup flow and the bridge configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
#[cfg(feature = "mqtt")]
use crate::error::ProtocolError;
#[cfg(feature = "mqtt")]
use crate::protocol::MqttBroker;

/// API URL offered by the setup form.
pub const DEFAULT_API_URL: &str = "http://192.168.1.100:8000";

/// Title given to every created entry.
pub const ENTRY_TITLE: &str = "EZ Matrix";

/// Name of the API URL form field.
pub const CONF_API_URL: &str = "api_url";

/// A configured switcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    entry_id: String,
    title: String,
    api_url: String,
}

impl ConfigEntry {
    /// Creates an entry with a fresh random id.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().simple().to_string(),
            title: ENTRY_TITLE.to_string(),
            api_url: api_url.into(),
        }
    }

    /// Replaces the entry id.
    #[must_use]
    pub fn with_entry_id(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = entry_id.into();
        self
    }

    /// Returns the entry id. Entity unique ids are prefixed with it.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Returns the entry title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the configured API URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// A field shown by the setup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    /// Field key.
    pub name: &'static str,
    /// Whether the field must be filled.
    pub required: bool,
    /// Pre-filled value.
    pub default: String,
}

/// Values submitted through the setup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    /// Base URL of the device REST API.
    pub api_url: String,
}

/// Result of a setup flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// A form to show to the user.
    Form {
        /// Step identifier.
        step_id: &'static str,
        /// Fields to fill.
        fields: Vec<FormField>,
    },
    /// The flow is finished and an entry was created.
    CreateEntry(ConfigEntry),
}

/// Single-step setup flow asking for the API URL.
///
/// The URL is not contacted here; an unreachable device fails the first
/// refresh when the entry is set up.
///
/// # Examples
///
/// ```
/// use ez_matrix::integration::{ConfigFlow, FlowStep, UserInput};
///
/// let FlowStep::Form { fields, .. } = ConfigFlow::step_user(None) else {
///     unreachable!()
/// };
/// assert_eq!(fields[0].default, "http://192.168.1.100:8000");
///
/// let input = UserInput { api_url: "http://10.0.0.5:8000".into() };
/// let FlowStep::CreateEntry(entry) = ConfigFlow::step_user(Some(input)) else {
///     unreachable!()
/// };
/// assert_eq!(entry.title(), "EZ Matrix");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigFlow;

impl ConfigFlow {
    /// Flow schema version.
    pub const VERSION: u32 = 1;

    /// Handles the user step.
    #[must_use]
    pub fn step_user(input: Option<UserInput>) -> FlowStep {
        match input {
            Some(input) => FlowStep::CreateEntry(ConfigEntry::new(input.api_url)),
            None => FlowStep::Form {
                step_id: "user",
                fields: vec![FormField {
                    name: CONF_API_URL,
                    required: true,
                    default: DEFAULT_API_URL.to_string(),
                }],
            },
        }
    }
}

// ============================================================================
// Bridge configuration file
// ============================================================================

/// Configuration of the `ez-matrix-bridge` binary.
///
/// ```json
/// {
///   "api_url": "http://192.168.1.100:8000",
///   "entry_id": "living_room",
///   "mqtt": { "host": "192.168.1.10", "port": 1883 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the device REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Fixed entry id; a random one is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Broker carrying push updates.
    #[serde(default)]
    pub mqtt: MqttSettings,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttSettings {
    /// Broker host.
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Username, if the broker requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password, if the broker requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            entry_id: None,
            mqtt: MqttSettings::default(),
        }
    }
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
        }
    }
}

impl BridgeConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or
    /// validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is invalid.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is empty".to_string()));
        }
        if self.entry_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid("entry_id is empty".to_string()));
        }
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.host is empty".to_string()));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::Invalid("mqtt.port must not be 0".to_string()));
        }
        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err(ConfigError::Invalid(
                "mqtt.username and mqtt.password must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the config entry described by this file.
    #[must_use]
    pub fn config_entry(&self) -> ConfigEntry {
        let entry = ConfigEntry::new(self.api_url.clone());
        match &self.entry_id {
            Some(id) => entry.with_entry_id(id.clone()),
            None => entry,
        }
    }
}

#[cfg(feature = "mqtt")]
impl MqttSettings {
    /// Connects to the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established.
    pub async fn connect(&self) -> Result<MqttBroker, ProtocolError> {
        let mut builder = MqttBroker::builder().host(&self.host).port(self.port);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            builder = builder.credentials(user, pass);
        }
        builder.build().await
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_gets_random_simple_id() {
        let a = ConfigEntry::new("http://a");
        let b = ConfigEntry::new("http://a");

        assert_eq!(a.entry_id().len(), 32);
        assert!(a.entry_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.entry_id(), b.entry_id());
        assert_eq!(a.title(), "EZ Matrix");
    }

    #[test]
    fn flow_shows_form_then_creates_entry() {
        let step = ConfigFlow::step_user(None);
        let FlowStep::Form { step_id, fields } = step else {
            panic!("expected form, got {step:?}");
        };
        assert_eq!(step_id, "user");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "api_url");
        assert!(fields[0].required);
        assert_eq!(fields[0].default, DEFAULT_API_URL);

        let input = UserInput {
            api_url: "http://10.0.0.5:8000".to_string(),
        };
        let FlowStep::CreateEntry(entry) = ConfigFlow::step_user(Some(input)) else {
            panic!("expected entry");
        };
        assert_eq!(entry.api_url(), "http://10.0.0.5:8000");
        assert_eq!(entry.title(), ENTRY_TITLE);
    }

    #[test]
    fn bridge_config_defaults() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.entry_id, None);
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn bridge_config_full() {
        let config = BridgeConfig::from_json(
            r#"{
                "api_url": "http://matrix.local:8000",
                "entry_id": "den",
                "mqtt": {"host": "broker", "port": 8883, "username": "u", "password": "p"}
            }"#,
        )
        .unwrap();

        let entry = config.config_entry();
        assert_eq!(entry.entry_id(), "den");
        assert_eq!(entry.api_url(), "http://matrix.local:8000");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("u"));
    }

    #[test]
    fn bridge_config_rejects_bad_values() {
        assert!(matches!(
            BridgeConfig::from_json(r#"{"api_url": " "}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{"mqtt": {"port": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{"mqtt": {"username": "u"}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[tokio::test]
    async fn load_missing_file() {
        let result = BridgeConfig::load("/nonexistent/ez_matrix.json").await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
