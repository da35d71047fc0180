//! Transport and codec errors raised around the bridge

use thiserror::Error;

/// Faults that can occur while moving calls across the host boundary.
///
/// The dispatcher itself never produces these: an unrecognized method is a
/// [`MethodOutcome::NotImplemented`](crate::MethodOutcome), not an error.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A payload could not be parsed as JSON.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The payload was valid JSON but not a call or reply envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A launch extra was not a primitive value.
    #[error("launch extra `{0}` is not a bool, integer or string")]
    InvalidExtra(String),

    /// The engine was pumped but produced no reply for the call.
    #[error("no reply for call {0}")]
    NoReply(u64),

    /// The other side of the messenger has been torn down.
    #[error("messenger disconnected")]
    Disconnected,
}
