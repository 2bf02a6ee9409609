//! Gateway close codes
//!
//! Which codes end a session, and which end a shard, is configuration data:
//! [`CloseCodeTable`] classifies a received code into a [`CloseAction`].

use chat_common::GatewayConfig;
use std::collections::HashSet;

/// Close code the client uses for an orderly shutdown
///
/// The remote invalidates the session when it sees this code.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code the client uses when it intends to resume afterwards
pub const RESUMABLE_CLOSURE: u16 = 4900;

/// Close codes sent by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimedOut),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload sent",
            Self::NotAuthenticated => "Payload sent before identifying",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Identified more than once",
            Self::InvalidSequence => "Invalid sequence sent when resuming",
            Self::RateLimited => "Rate limited",
            Self::SessionTimedOut => "Session timed out",
            Self::InvalidShard => "Invalid shard sent when identifying",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Invalid API version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::AlreadyAuthenticated => "AlreadyAuthenticated",
            Self::InvalidSequence => "InvalidSequence",
            Self::RateLimited => "RateLimited",
            Self::SessionTimedOut => "SessionTimedOut",
            Self::InvalidShard => "InvalidShard",
            Self::ShardingRequired => "ShardingRequired",
            Self::InvalidApiVersion => "InvalidApiVersion",
            Self::InvalidIntents => "InvalidIntents",
            Self::DisallowedIntents => "DisallowedIntents",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// What a shard does after its transport closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Reconnect right away and resume the session
    Resume,
    /// Forget the session and identify again after backoff
    Reidentify,
    /// Stop the shard
    Fatal,
}

/// Close code classification table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseCodeTable {
    fatal: HashSet<u16>,
    reidentify: HashSet<u16>,
}

impl CloseCodeTable {
    #[must_use]
    pub fn new(
        fatal: impl IntoIterator<Item = u16>,
        reidentify: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            fatal: fatal.into_iter().collect(),
            reidentify: reidentify.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.fatal_close_codes.iter().copied(),
            config.reidentify_close_codes.iter().copied(),
        )
    }

    /// Classify a close code; `None` means the transport ended without a close frame
    ///
    /// Fatal wins over reidentify when a code is listed in both.
    #[must_use]
    pub fn classify(&self, code: Option<u16>) -> CloseAction {
        match code {
            Some(code) if self.fatal.contains(&code) => CloseAction::Fatal,
            Some(code) if self.reidentify.contains(&code) => CloseAction::Reidentify,
            _ => CloseAction::Resume,
        }
    }
}

impl Default for CloseCodeTable {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::new(String::new()))
    }
}
