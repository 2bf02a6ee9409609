//! Gateway connections
//!
//! A [`Shard`] runs one session over a [`Transport`]; the [`ShardManager`]
//! starts and stops a set of them.

mod backoff;
mod heartbeat;
mod manager;
mod ratelimit;
mod shard;
mod state;
mod transport;

pub use backoff::{random_delay, Backoff};
pub use heartbeat::{HeartbeatAction, HeartbeatClock};
pub use manager::{ManagerStatus, ShardManager};
pub use ratelimit::IdentifyLimiter;
pub use shard::{
    Shard, ShardContext, ShardExit, ShardHandle, ShardId, ShardSettings, ShardSnapshot,
};
pub use state::{ConnectionStatus, Handshake, SessionDescriptor, SessionState};
pub use transport::{
    CloseInfo, Connector, Transport, TransportMessage, WebSocketConnector, WebSocketTransport,
};
