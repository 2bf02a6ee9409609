//! Client context shared by all shards

use crate::broadcast::{EventDispatcher, EventListener};
use crate::error::{ErrorReporter, TracingReporter};
use chat_cache::{CacheFlags, Caches};
use std::sync::Arc;

/// Caches, listeners and error reporting for one application
pub struct Client {
    caches: Caches,
    events: EventDispatcher,
    reporter: Arc<dyn ErrorReporter>,
}

impl Client {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.reporter
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("caches", &self.caches)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`]
#[derive(Default)]
pub struct ClientBuilder {
    cache_flags: CacheFlags,
    reporter: Option<Arc<dyn ErrorReporter>>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl ClientBuilder {
    #[must_use]
    pub fn cache_flags(mut self, flags: CacheFlags) -> Self {
        self.cache_flags = flags;
        self
    }

    /// Replace the default tracing reporter
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Client> {
        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(TracingReporter));
        let events = EventDispatcher::new(reporter.clone());
        for listener in self.listeners {
            events.add_listener(listener);
        }

        Arc::new(Client {
            caches: Caches::new(self.cache_flags),
            events,
            reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder().build();
        assert_eq!(client.caches().flags(), CacheFlags::DEFAULT);
        assert_eq!(client.events().listener_count(), 0);
    }

    #[test]
    fn test_builder_registers_listeners() {
        let client = Client::builder()
            .cache_flags(CacheFlags::all())
            .listener(Arc::new(|_event: &Event| {}))
            .listener(Arc::new(|_event: &Event| {}))
            .build();

        assert!(client.caches().messages().is_enabled());
        assert_eq!(client.events().listener_count(), 2);
    }
}
