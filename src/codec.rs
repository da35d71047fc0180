//! JSON method codec used on the platform channels
//!
//! - call: `{"method": "...", "args": ...}`
//! - success reply: `[result]`
//! - not-implemented reply: empty payload

use serde_json::Value;

use crate::{BridgeError, MethodCall, MethodOutcome};

/// Encodes a call for the host
pub fn encode_call(call: &MethodCall) -> Result<Vec<u8>, BridgeError> {
    Ok(serde_json::to_vec(call)?)
}

/// Decodes a call issued by the embedded runtime
pub fn decode_call(payload: &[u8]) -> Result<MethodCall, BridgeError> {
    let value: Value = serde_json::from_slice(payload)?;
    match value.get("method") {
        Some(Value::String(_)) => Ok(serde_json::from_value(value)?),
        _ => Err(BridgeError::MalformedEnvelope(
            "call is missing a string `method`".to_owned(),
        )),
    }
}

/// Encodes an outcome as a reply payload
pub fn encode_outcome(outcome: &MethodOutcome) -> Vec<u8> {
    match outcome {
        // A single-element array of an in-memory Value always serializes
        MethodOutcome::Success(value) => {
            serde_json::to_vec(&[value]).unwrap_or_else(|_| b"[null]".to_vec())
        }
        MethodOutcome::NotImplemented => Vec::new(),
    }
}

/// Decodes a reply payload
pub fn decode_outcome(payload: &[u8]) -> Result<MethodOutcome, BridgeError> {
    if payload.is_empty() {
        return Ok(MethodOutcome::NotImplemented);
    }

    match serde_json::from_slice::<Value>(payload)? {
        Value::Array(mut items) if items.len() == 1 => {
            Ok(MethodOutcome::Success(items.swap_remove(0)))
        }
        other => Err(BridgeError::MalformedEnvelope(format!(
            "expected a single-element success envelope, got {other}"
        ))),
    }
}
