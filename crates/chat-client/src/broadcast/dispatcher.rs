//! Event dispatcher
//!
//! Delivers each event to every registered listener, in registration order.
//! A panicking listener is reported and skipped; delivery continues.

use crate::error::{ErrorReporter, GatewayError};
use crate::events::Event;
use parking_lot::RwLock;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Receives every dispatched event
///
/// Listeners run on the shard's task; long work should be handed off.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event);
    }
}

/// Result of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered fan-out of events to listeners
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            reporter,
        }
    }

    /// Register a listener; returns its position
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) -> usize {
        let mut listeners = self.listeners.write();
        listeners.push(listener);
        listeners.len() - 1
    }

    /// Register a closure as a listener
    pub fn on<F>(&self, listener: F) -> usize
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an event to every listener
    ///
    /// Works on a snapshot of the listener list, so listeners may register
    /// others without deadlocking; those see the next event.
    pub fn dispatch(&self, event: &Event) -> DispatchOutcome {
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().clone();
        let mut outcome = DispatchOutcome::default();

        for (index, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(()) => outcome.delivered += 1,
                Err(panic) => {
                    outcome.failed += 1;
                    self.reporter.report(
                        event.shard_id(),
                        &GatewayError::ListenerPanicked {
                            listener: index,
                            event: event.name(),
                            message: panic_message(panic.as_ref()),
                        },
                    );
                }
            }
        }

        tracing::trace!(
            event = event.name(),
            seq = event.sequence(),
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Event dispatched"
        );

        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
