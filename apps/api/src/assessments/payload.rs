//! Answer payloads as decided at the HTTP boundary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A candidate's answer to one question.
///
/// JSON objects are kept as structured fields; every other JSON value (string,
/// number, bool, array, null) is a raw value stored inside a `{value: ...}`
/// envelope so all stored responses are objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum AnswerPayload {
    Raw(Value),
    Structured(Map<String, Value>),
}

impl From<Value> for AnswerPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => AnswerPayload::Structured(fields),
            other => AnswerPayload::Raw(other),
        }
    }
}

impl From<AnswerPayload> for Value {
    fn from(payload: AnswerPayload) -> Self {
        payload.into_stored()
    }
}

impl AnswerPayload {
    /// Storage form: always a JSON object.
    pub fn into_stored(self) -> Value {
        match self {
            AnswerPayload::Raw(value) => json!({ "value": value }),
            AnswerPayload::Structured(fields) => Value::Object(fields),
        }
    }
}

/// Text used to compare a stored response against a question's correct answer.
///
/// Reads the `value` field of the stored object; strings, numbers and bools
/// compare by their textual form, anything else is not comparable.
pub fn comparable_text(stored: &Value) -> Option<String> {
    match stored.get("value")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
