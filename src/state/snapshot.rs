// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-known device state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{InputPort, OutputPort};

/// Value reported for missing text fields.
pub const UNKNOWN: &str = "Unknown";

/// Value reported for a missing EDID index.
pub const DEFAULT_EDID_INDEX: &str = "0";

/// The last-known full state of the matrix switcher.
///
/// A snapshot is the JSON object returned by `GET /status` (or carried in
/// the `current_state` field of a push message):
///
/// ```json
/// {
///   "outputs": { "output_1_source": "Input 2" },
///   "inputs_edid_index": { "input_1_edid_index": 3 },
///   "cascade_mode": "Off",
///   "device_status": "OK"
/// }
/// ```
///
/// The body is not validated against a schema. Readers never fail on a
/// missing key; each accessor falls back to a documented default.
///
/// # Examples
///
/// ```
/// use ez_matrix::state::Snapshot;
/// use ez_matrix::types::OutputPort;
///
/// let snapshot = Snapshot::from_json(r#"{"cascade_mode": "Auto"}"#).unwrap();
/// assert_eq!(snapshot.cascade_mode(), "Auto");
/// assert_eq!(snapshot.device_status(), "Unknown");
/// assert_eq!(snapshot.output_source(OutputPort::new(1).unwrap()), "Unknown");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a snapshot from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the text is not JSON, or
    /// `ParseError::UnexpectedFormat` if it is not a JSON object.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Converts a decoded JSON value into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnexpectedFormat` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParseError::UnexpectedFormat(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns `true` if the snapshot has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a top-level value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the source label reported for an output, or `"Unknown"`.
    ///
    /// The label is returned as reported; it may not be a valid selector
    /// option.
    #[must_use]
    pub fn output_source(&self, output: OutputPort) -> &str {
        let key = format!("output_{}_source", output.number());
        self.nested("outputs", &key)
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN)
    }

    /// Returns the EDID index of an input as text, or `"0"`.
    ///
    /// The device may report the index as a number or a string.
    #[must_use]
    pub fn edid_index(&self, input: InputPort) -> String {
        let key = format!("input_{}_edid_index", input.number());
        match self.nested("inputs_edid_index", &key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => DEFAULT_EDID_INDEX.to_string(),
        }
    }

    /// Returns the cascade mode, or `"Unknown"`.
    #[must_use]
    pub fn cascade_mode(&self) -> &str {
        self.text("cascade_mode")
    }

    /// Returns the device status, or `"Unknown"`.
    #[must_use]
    pub fn device_status(&self) -> &str {
        self.text("device_status")
    }

    fn text(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or(UNKNOWN)
    }

    fn nested(&self, section: &str, key: &str) -> Option<&Value> {
        self.0.get(section)?.as_object()?.get(key)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> Snapshot {
        Snapshot::from_value(json!({
            "outputs": {
                "output_1_source": "Input 2",
                "output_2_source": "Input 4"
            },
            "inputs_edid_index": {
                "input_1_edid_index": 3,
                "input_2_edid_index": "11"
            },
            "cascade_mode": "Off",
            "device_status": "OK"
        }))
        .unwrap()
    }

    #[test]
    fn reads_nested_fields() {
        let s = full();
        assert_eq!(s.output_source(OutputPort::new(1).unwrap()), "Input 2");
        assert_eq!(s.output_source(OutputPort::new(2).unwrap()), "Input 4");
        assert_eq!(s.cascade_mode(), "Off");
        assert_eq!(s.device_status(), "OK");
    }

    #[test]
    fn edid_index_is_coerced_to_text() {
        let s = full();
        assert_eq!(s.edid_index(InputPort::new(1).unwrap()), "3");
        assert_eq!(s.edid_index(InputPort::new(2).unwrap()), "11");
        assert_eq!(s.edid_index(InputPort::new(3).unwrap()), "0");
    }

    #[test]
    fn empty_snapshot_uses_defaults() {
        let s = Snapshot::new();
        assert!(s.is_empty());
        assert_eq!(s.output_source(OutputPort::new(1).unwrap()), UNKNOWN);
        assert_eq!(s.edid_index(InputPort::new(4).unwrap()), DEFAULT_EDID_INDEX);
        assert_eq!(s.cascade_mode(), UNKNOWN);
        assert_eq!(s.device_status(), UNKNOWN);
    }

    #[test]
    fn wrong_section_type_falls_back() {
        let s = Snapshot::from_value(json!({"outputs": "broken", "cascade_mode": 3})).unwrap();
        assert_eq!(s.output_source(OutputPort::new(1).unwrap()), UNKNOWN);
        assert_eq!(s.cascade_mode(), UNKNOWN);
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(
            Snapshot::from_json("[1, 2]"),
            Err(ParseError::UnexpectedFormat(_))
        ));
        assert!(matches!(
            Snapshot::from_json("<html>"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn serializes_transparently() {
        let s = Snapshot::from_json(r#"{"cascade_mode":"Auto"}"#).unwrap();
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"cascade_mode": "Auto"}));
    }
}
