//! Event broadcasting
//!
//! Fan-out of events to listeners registered on the client.

mod dispatcher;

pub use dispatcher::{DispatchOutcome, EventDispatcher, EventListener};
