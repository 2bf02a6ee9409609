//! Session state machine
//!
//! Pure bookkeeping for one shard: connection status, the session issued by
//! the remote, and the last observed sequence. The shard task owns the only
//! instance, so nothing here is synchronized.

use crate::protocol::CloseAction;
use serde::Serialize;
use std::fmt;

/// Lifecycle status of a shard connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Identifying,
    Resuming,
    Connected,
    Reconnecting,
    ShuttingDown,
    /// Stopped by a fatal close code; never retried
    Failed,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::ShuttingDown => "shutting_down",
            Self::Failed => "failed",
        }
    }

    /// No further transitions happen from this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Failed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session issued by the remote on READY
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub session_id: String,
    pub resume_url: Option<String>,
}

/// Handshake to perform after HELLO
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    Identify,
    /// `sequence` is `None` when no dispatch carried one yet
    Resume {
        session_id: String,
        sequence: Option<u64>,
    },
}

/// Connection status, session and sequence of one shard
#[derive(Debug, Clone)]
pub struct SessionState {
    status: ConnectionStatus,
    session: Option<SessionDescriptor>,
    last_sequence: Option<u64>,
}

impl SessionState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            session: None,
            last_sequence: None,
        }
    }

    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn session(&self) -> Option<&SessionDescriptor> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn resume_url(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.resume_url.as_deref())
    }

    pub const fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Whether the next handshake will be a resume
    pub const fn can_resume(&self) -> bool {
        self.session.is_some()
    }

    pub fn begin_connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// Pick the handshake once the remote said hello
    pub fn on_hello(&mut self) -> Handshake {
        match &self.session {
            Some(session) => {
                self.status = ConnectionStatus::Resuming;
                Handshake::Resume {
                    session_id: session.session_id.clone(),
                    sequence: self.last_sequence,
                }
            }
            None => {
                self.status = ConnectionStatus::Identifying;
                Handshake::Identify
            }
        }
    }

    /// Record a dispatch sequence; never moves backwards
    pub fn observe_sequence(&mut self, sequence: u64) {
        self.last_sequence = Some(self.last_sequence.map_or(sequence, |last| last.max(sequence)));
    }

    pub fn on_ready(&mut self, session_id: String, resume_url: Option<String>) {
        self.session = Some(SessionDescriptor {
            session_id,
            resume_url,
        });
        self.status = ConnectionStatus::Connected;
    }

    pub fn on_resumed(&mut self) {
        self.status = ConnectionStatus::Connected;
    }

    /// Apply a classified transport close
    pub fn on_close(&mut self, action: CloseAction) {
        match action {
            CloseAction::Resume => self.status = self.retry_status(),
            CloseAction::Reidentify => {
                self.forget_session();
                self.status = ConnectionStatus::Disconnected;
            }
            CloseAction::Fatal => {
                self.forget_session();
                self.status = ConnectionStatus::Failed;
            }
        }
    }

    /// A missed heartbeat ack counts as a dead but resumable connection
    pub fn on_heartbeat_timeout(&mut self) {
        self.status = self.retry_status();
    }

    pub fn on_invalid_session(&mut self, resumable: bool) {
        if resumable {
            self.status = ConnectionStatus::Reconnecting;
        } else {
            self.forget_session();
            self.status = ConnectionStatus::Disconnected;
        }
    }

    pub fn on_reconnect_request(&mut self) {
        self.status = self.retry_status();
    }

    pub fn on_connect_failed(&mut self) {
        self.status = self.retry_status();
    }

    // Reconnecting only while a session can be resumed
    const fn retry_status(&self) -> ConnectionStatus {
        if self.session.is_some() {
            ConnectionStatus::Reconnecting
        } else {
            ConnectionStatus::Disconnected
        }
    }

    pub fn shutdown(&mut self) {
        self.status = ConnectionStatus::ShuttingDown;
    }

    fn forget_session(&mut self) {
        self.session = None;
        self.last_sequence = None;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
