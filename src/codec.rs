//! Payload codec shared by the supervisor and the worker programs it starts.
//!
//! A payload travels as a single process argument: the JSON text of the value,
//! base64-encoded with the standard alphabet. The result never contains
//! whitespace or control characters, so it survives argv and shell quoting.

use crate::error::CodecError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Encode a payload into a process-argument-safe string.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(payload)?;
    Ok(STANDARD.encode(json))
}

/// Decode an argument produced by [`encode`].
///
/// Worker programs call this on their first argument.
pub fn decode<T: DeserializeOwned>(argument: &str) -> Result<T, CodecError> {
    let bytes = STANDARD.decode(argument.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// The payload used when a caller supplies none: an empty JSON array.
pub fn empty_payload() -> Value {
    Value::Array(Vec::new())
}
