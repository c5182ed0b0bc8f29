//! Inbound messages.
//!
//! The appliance answers each command with exactly one `ack` or `error` and
//! pushes `data` whenever the state of a scale changes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Messages sent from the appliance to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplianceMessage {
    /// The executing command succeeded.
    Ack,
    /// The executing command failed. The message is empty when the
    /// appliance sent none.
    Error {
        #[serde(default, deserialize_with = "message_text")]
        message: String,
    },
    /// Unsolicited state push for one scale.
    Data(ScaleData),
}

impl ApplianceMessage {
    /// Parse a text frame.
    ///
    /// Frames without a `type` field and frames with an unknown `type` are
    /// reported as distinct errors so the caller can log them apart.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => return Err(MessageError::UnknownType(other.to_string())),
            None => return Err(MessageError::MissingType),
        };
        match kind.as_str() {
            "ack" | "error" | "data" => {
                serde_json::from_value(value).map_err(|e| MessageError::Malformed {
                    kind,
                    reason: e.to_string(),
                })
            }
            _ => Err(MessageError::UnknownType(kind)),
        }
    }
}

/// Any `message` value is accepted so that an `error` reply always settles
/// the executing command.
fn message_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// State push for one scale, forwarded to consumers as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleData {
    pub index: usize,
    /// `true` when `state` replaces the previous state entirely.
    #[serde(rename = "isFull", default)]
    pub is_full: bool,
    #[serde(default)]
    pub state: Value,
    /// Diagnostic fields the appliance adds next to `state` (e.g. `adc`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Error parsing an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message without type designation")]
    MissingType,
    #[error("unexpected message type: {0}")]
    UnknownType(String),
    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: String, reason: String },
}
