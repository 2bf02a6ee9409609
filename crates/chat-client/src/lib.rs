//! # chat-client
//!
//! Sharded gateway client: keeps authenticated sessions to an event-streaming
//! gateway alive and turns dispatch frames into cache updates and typed events.
//!
//! ```no_run
//! use chat_client::{Client, ShardManager, WebSocketConnector};
//! use chat_common::GatewayConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GatewayConfig::from_env()?;
//! let client = Client::builder()
//!     .listener(Arc::new(|event: &chat_client::Event| {
//!         println!("{} on shard {}", event.name(), event.shard_id());
//!     }))
//!     .build();
//!
//! let manager = ShardManager::new(client, &config, Arc::new(WebSocketConnector))?;
//! manager.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod protocol;

pub use broadcast::{EventDispatcher, EventListener};
pub use client::{Client, ClientBuilder};
pub use connection::{
    ConnectionStatus, ManagerStatus, Shard, ShardHandle, ShardId, ShardManager, ShardSnapshot,
    WebSocketConnector,
};
pub use error::{
    DecodeError, ErrorReporter, GatewayError, GatewayResult, ProtocolError, ShutdownError,
    TracingReporter, TransportError,
};
pub use events::{Event, EventKind, GatewayEventType};
pub use handlers::HandlerRegistry;
