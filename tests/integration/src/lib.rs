//! Integration test utilities for the gateway client
//!
//! This crate provides an in-process WebSocket gateway that tests drive
//! frame by frame while a real shard manager talks to it.

pub mod helpers;
pub mod fixtures;

pub use helpers::*;
pub use fixtures::*;
