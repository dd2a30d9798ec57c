// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push message decoding.

use serde_json::Value;

use crate::error::ParseError;
use crate::state::Snapshot;

/// Key carrying the full device state in a push message.
pub const CURRENT_STATE_KEY: &str = "current_state";

/// Extracts the snapshot carried by a push message.
///
/// The message must be a JSON object with a `current_state` object. Other
/// keys are ignored.
///
/// # Errors
///
/// Returns `ParseError::Json` for invalid JSON, `ParseError::MissingField`
/// when `current_state` is absent, and `ParseError::UnexpectedFormat` when
/// the message or its `current_state` is not an object.
///
/// # Examples
///
/// ```
/// use ez_matrix::sync::parse_push;
///
/// let snapshot = parse_push(r#"{"current_state": {"cascade_mode": "Auto"}}"#).unwrap();
/// assert_eq!(snapshot.cascade_mode(), "Auto");
///
/// assert!(parse_push(r#"{"event": "boot"}"#).is_err());
/// ```
pub fn parse_push(payload: &str) -> Result<Snapshot, ParseError> {
    let message: Value = serde_json::from_str(payload)?;

    let Value::Object(mut message) = message else {
        return Err(ParseError::UnexpectedFormat(
            "push message is not a JSON object".to_string(),
        ));
    };

    let state = message
        .remove(CURRENT_STATE_KEY)
        .ok_or_else(|| ParseError::MissingField(CURRENT_STATE_KEY.to_string()))?;

    Snapshot::from_value(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_current_state() {
        let payload = r#"{
            "event": "switch",
            "current_state": {
                "outputs": {"output_1_source": "Input 3"},
                "device_status": "OK"
            }
        }"#;
        let snapshot = parse_push(payload).unwrap();
        assert_eq!(snapshot.device_status(), "OK");
        assert!(snapshot.get("event").is_none());
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(parse_push("not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn missing_current_state() {
        assert!(matches!(
            parse_push(r#"{"status": "ok"}"#),
            Err(ParseError::MissingField(field)) if field == CURRENT_STATE_KEY
        ));
    }

    #[test]
    fn non_object_message() {
        assert!(matches!(
            parse_push("[]"),
            Err(ParseError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn non_object_current_state() {
        assert!(matches!(
            parse_push(r#"{"current_state": null}"#),
            Err(ParseError::UnexpectedFormat(_))
        ));
    }
}
