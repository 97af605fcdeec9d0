//! Error types for the scheduler driver.

use std::time::Duration;

use mesos_proto::CallType;
use thiserror::Error;

/// Errors surfaced by calls and by the subscription stream.
///
/// Decode failures of a single event and snapshot write failures never show
/// up here: both are logged where they happen and the driver carries on.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Connection refused, TLS failure, timeout, or a broken body stream.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The master answered with a status other than the expected one.
    #[error("master rejected {call} call with status {status}: {body}")]
    Rejected {
        call: CallType,
        status: u16,
        body: String,
    },

    /// An introspection query answered with a non-success status.
    #[error("master query {path} failed with status {status}: {body}")]
    Query {
        path: String,
        status: u16,
        body: String,
    },

    /// A call was attempted before a session token was issued.
    #[error("no session token; subscribe before sending {0} calls")]
    NotSubscribed(CallType),

    /// The subscription stream violated the record framing.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The master closed the subscription stream.
    #[error("subscription stream closed by master")]
    StreamClosed,

    /// No bytes arrived within the heartbeat grace period.
    #[error("no heartbeat from master within {0:?}")]
    HeartbeatTimeout(Duration),

    /// The call could not be encoded.
    #[error("failed to encode call: {0}")]
    Encode(#[from] serde_json::Error),

    /// The task is not known to the local store.
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl DriverError {
    /// Returns true if this error, raised while reading events, ends the
    /// subscription.
    ///
    /// The top-level loop must re-subscribe from scratch after any of these.
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            DriverError::Transport(_)
                | DriverError::Protocol(_)
                | DriverError::StreamClosed
                | DriverError::HeartbeatTimeout(_)
        )
    }
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;
