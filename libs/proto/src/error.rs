//! Error types for wire decoding.

use thiserror::Error;

/// Errors that can occur when decoding a message from the master.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// The payload is not valid JSON for the expected message.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The event names a kind but lacks the matching payload field.
    #[error("event {kind} is missing its '{field}' payload")]
    MissingPayload { kind: String, field: &'static str },
}

impl From<serde_json::Error> for ProtoError {
    fn from(err: serde_json::Error) -> Self {
        ProtoError::Malformed(err.to_string())
    }
}
