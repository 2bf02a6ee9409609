//! Gateway error types
//!
//! Transport errors and heartbeat timeouts are recovered by reconnecting.
//! Protocol and decode errors are recovered locally and only reported.
//! Auth and other fatal close codes stop the shard.

use crate::protocol::OpCode;
use std::time::Duration;
use thiserror::Error;

/// Errors from the underlying message transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Failed to receive frame: {0}")]
    Receive(String),

    #[error("Connection closed (code {code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Frames that could not be understood at the envelope level
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unknown op code: {0}")]
    UnknownOpCode(u8),

    #[error("Unexpected op code from remote: {0}")]
    UnexpectedOpCode(OpCode),

    #[error("Missing payload for {0}")]
    MissingPayload(OpCode),

    #[error("Dispatch frame without an event type")]
    MissingEventType,
}

/// A dispatch payload did not match the schema of its event type
#[derive(Debug, Error)]
#[error("Failed to decode {event_type} payload: {source}")]
pub struct DecodeError {
    pub event_type: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Authentication rejected (close code {code}): {reason}")]
    Auth { code: u16, reason: String },

    #[error("No heartbeat acknowledgement within {interval:?}")]
    HeartbeatTimeout { interval: Duration },

    #[error("Unrecoverable close (code {code}): {reason}")]
    Fatal { code: u16, reason: String },

    #[error("Listener {listener} panicked on {event}: {message}")]
    ListenerPanicked {
        listener: usize,
        event: &'static str,
        message: String,
    },

    #[error("Cancelled by shutdown")]
    Cancelled,
}

impl GatewayError {
    /// Check if the shard keeps running after this error
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !self.is_terminal()
    }

    /// Check if this error ends the shard
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Fatal { .. } | Self::Cancelled)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Shard manager shutdown did not finish in time
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("Shutdown incomplete, shards still running: {pending:?}")]
    Incomplete { pending: Vec<u32> },
}

/// Observability hook for errors the gateway recovers from on its own
pub trait ErrorReporter: Send + Sync {
    fn report(&self, shard_id: u32, error: &GatewayError);
}

/// Reports errors as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, shard_id: u32, error: &GatewayError) {
        if error.is_terminal() {
            tracing::error!(shard_id, error = %error, "Gateway error");
        } else {
            tracing::warn!(shard_id, error = %error, "Gateway error");
        }
    }
}
