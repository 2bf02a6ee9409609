//! Dispatch handlers
//!
//! One decoder and processor per event type, collected in a [`HandlerRegistry`].
//! Processors write to the caches first, then dispatch events, so listeners
//! always observe caches that already reflect the event.

mod channel;
mod guild;
mod member;
mod message;
mod registry;
mod session;

pub(crate) use registry::decode_as;
pub use registry::{
    DecodedPayload, EmptyHandler, EmptyProcessor, GatewayHandler, HandlerContext,
    HandlerRegistry, HandlerRegistryBuilder, Processor, TypedHandler,
};
