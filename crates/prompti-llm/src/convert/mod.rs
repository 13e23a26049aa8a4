//! Canonical request to vendor wire body

pub mod anthropic;
pub mod openai;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LlmError;

/// Serialize a typed wire body and merge caller overrides on top
///
/// Overrides replace top-level keys wholesale, including ones this layer
/// computed.
pub(crate) fn finish_wire<T: Serialize>(wire: &T, overrides: &Map<String, Value>) -> Result<Value, LlmError> {
    let mut body = serde_json::to_value(wire).map_err(|e| anyhow::anyhow!("failed to encode wire request: {e}"))?;

    if let Value::Object(fields) = &mut body {
        for (key, value) in overrides {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(body)
}

/// Text substituted for a file the vendor cannot take natively
pub(crate) fn file_placeholder(url: &str) -> String {
    format!("[file: {url}]")
}
