//! Gateway frame codec
//!
//! Every frame is a JSON object `{ op, s, t, d }`.

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
    ResumePayload,
};
use crate::error::{ProtocolError, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single gateway frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    pub d: Option<Value>,
}

// Envelope decoded before the op code is validated, so unknown op codes
// can be told apart from malformed JSON
#[derive(Deserialize)]
struct RawFrame {
    op: u8,
    t: Option<String>,
    s: Option<u64>,
    d: Option<Value>,
}

impl GatewayMessage {
    const fn control(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d,
        }
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1) carrying the last sequence
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::control(OpCode::Heartbeat, Some(last_sequence.map_or(Value::Null, Value::from)))
    }

    /// Create an Identify message (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, TransportError> {
        Self::encoded(OpCode::Identify, payload)
    }

    /// Create a Presence Update message (op=3)
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Result<Self, TransportError> {
        Self::encoded(OpCode::PresenceUpdate, payload)
    }

    /// Create a Resume message (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, TransportError> {
        Self::encoded(OpCode::Resume, payload)
    }

    /// Create a Request Guild Members message (op=8)
    pub fn request_guild_members(
        payload: &RequestGuildMembersPayload,
    ) -> Result<Self, TransportError> {
        Self::encoded(OpCode::RequestGuildMembers, payload)
    }

    fn encoded<T: Serialize>(op: OpCode, payload: &T) -> Result<Self, TransportError> {
        Ok(Self::control(op, Some(serde_json::to_value(payload)?)))
    }

    // === Remote Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::control(
            OpCode::Hello,
            Some(serde_json::json!({ "heartbeat_interval": payload.heartbeat_interval })),
        )
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::control(OpCode::HeartbeatAck, None)
    }

    /// Create a Reconnect message (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::control(OpCode::Reconnect, None)
    }

    /// Create an Invalid Session message (op=9)
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::control(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Parsing ===

    /// Parse the Hello payload (op=10)
    pub fn as_hello(&self) -> Result<HelloPayload, ProtocolError> {
        let data = self
            .d
            .as_ref()
            .ok_or(ProtocolError::MissingPayload(self.op))?;
        HelloPayload::deserialize(data).map_err(ProtocolError::Malformed)
    }

    /// Whether an Invalid Session (op=9) allows resuming
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.d.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON text frame
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Self::from_raw(serde_json::from_str(json).map_err(ProtocolError::Malformed)?)
    }

    /// Deserialize from a binary frame carrying UTF-8 JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_raw(serde_json::from_slice(bytes).map_err(ProtocolError::Malformed)?)
    }

    fn from_raw(raw: RawFrame) -> Result<Self, ProtocolError> {
        let op = OpCode::from_u8(raw.op).ok_or(ProtocolError::UnknownOpCode(raw.op))?;
        Ok(Self {
            op,
            t: raw.t,
            s: raw.s,
            d: raw.d,
        })
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
