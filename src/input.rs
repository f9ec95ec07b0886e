//! Loading raw messages from JSON files.
//!
//! Accepts either a bare array of messages or an object with a `messages`
//! array. Records are decoded one at a time so a single bad record is
//! rejected without losing the rest of the file.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{InputError, Result};
use crate::pipeline::types::RawMessage;

/// Decoded records plus the ones that failed to decode.
#[derive(Debug, Default)]
pub struct LoadedMessages {
    pub messages: Vec<RawMessage>,
    pub rejected: Vec<InputError>,
}

pub fn load_messages(path: impl AsRef<Path>) -> Result<LoadedMessages> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let loaded = parse_messages(&contents)?;
    debug!(
        path = %path.display(),
        messages = loaded.messages.len(),
        rejected = loaded.rejected.len(),
        "Loaded input file"
    );
    Ok(loaded)
}

pub fn parse_messages(json: &str) -> Result<LoadedMessages> {
    let document: Value = serde_json::from_str(json)?;

    let records = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("messages") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(InputError::UnsupportedShape("`messages` is not an array".into()).into());
            }
            None => {
                return Err(InputError::UnsupportedShape("object without `messages`".into()).into());
            }
        },
        other => {
            return Err(InputError::UnsupportedShape(format!("top-level {}", kind(&other))).into());
        }
    };

    let mut loaded = LoadedMessages::default();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawMessage>(record) {
            Ok(message) => loaded.messages.push(message),
            Err(e) => {
                warn!(index, error = %e, "Rejecting undecodable record");
                loaded.rejected.push(InputError::Malformed {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(loaded)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
