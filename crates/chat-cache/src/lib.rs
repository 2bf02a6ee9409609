//! # chat-cache
//!
//! In-memory caches for entities received over the gateway.
//!
//! ## Features
//!
//! - **Grouped storage**: every entity is keyed by a scope (usually its guild or channel) and its own ID
//! - **Concurrent access**: backed by `DashMap`, safe for puts from many shards at once
//! - **Cache flags**: individual entity caches can be switched off
//!
//! ## Example
//!
//! ```ignore
//! use chat_cache::{CacheFlags, CacheStore, Caches};
//!
//! let caches = Caches::new(CacheFlags::all());
//! caches.channels().put(guild_id, channel.id, channel);
//! let cached = caches.channels().get(guild_id, channel_id);
//! ```

pub mod store;

pub use store::{CacheFlags, CacheStore, Caches, GroupedCache};
