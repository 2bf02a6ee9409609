//! Handler registry
//!
//! Maps each dispatch event name to a decoder and a processor. The decode step
//! turns the raw payload into a typed value; the process step updates caches
//! and hands the resulting events to the client's dispatcher.
//!
//! The table is keyed by the wire name in `t`, so embedders can register
//! handlers for events the built-in [`GatewayEventType`] set does not know.

use crate::broadcast::DispatchOutcome;
use crate::client::Client;
use crate::error::DecodeError;
use crate::events::{Event, EventKind, GatewayEventType, GenericEvent};
use chat_cache::Caches;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// What a processor gets to work with
pub struct HandlerContext<'a> {
    client: &'a Arc<Client>,
    shard_id: u32,
    sequence: u64,
}

impl<'a> HandlerContext<'a> {
    #[must_use]
    pub fn new(client: &'a Arc<Client>, shard_id: u32, sequence: u64) -> Self {
        Self {
            client,
            shard_id,
            sequence,
        }
    }

    pub fn client(&self) -> &Arc<Client> {
        self.client
    }

    pub fn caches(&self) -> &Caches {
        self.client.caches()
    }

    pub const fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Build an event from this context and deliver it to every listener
    pub fn dispatch(&self, kind: EventKind) -> DispatchOutcome {
        let event = Event::new(GenericEvent::new(self.client, self.shard_id, self.sequence), kind);
        self.client.events().dispatch(&event)
    }
}

/// Processor for a typed payload
pub type Processor<T> = fn(&HandlerContext<'_>, T);

/// Processor for an event without a payload
pub type EmptyProcessor = fn(&HandlerContext<'_>);

/// Decoder and processor for one event name
pub trait GatewayHandler: Send + Sync {
    /// Wire name this handler is registered under, e.g. `MESSAGE_CREATE`
    fn name(&self) -> &'static str;

    /// Built-in event type, when the name is one the session loop knows
    fn event_type(&self) -> Option<GatewayEventType> {
        GatewayEventType::from_str(self.name())
    }

    /// Decode the raw `d` field; `None` when the frame had no payload
    fn decode(&self, raw: Option<&Value>) -> Result<DecodedPayload, DecodeError>;
}

trait ProcessPayload: Send {
    fn process(self: Box<Self>, ctx: &HandlerContext<'_>);
}

struct Typed<T> {
    payload: T,
    processor: Processor<T>,
}

impl<T: Send> ProcessPayload for Typed<T> {
    fn process(self: Box<Self>, ctx: &HandlerContext<'_>) {
        (self.processor)(ctx, self.payload);
    }
}

struct Empty {
    processor: EmptyProcessor,
}

impl ProcessPayload for Empty {
    fn process(self: Box<Self>, ctx: &HandlerContext<'_>) {
        (self.processor)(ctx);
    }
}

/// A decoded payload bound to its processor, ready to run
pub struct DecodedPayload(Box<dyn ProcessPayload>);

impl DecodedPayload {
    /// Update caches and dispatch the resulting events
    pub fn process(self, ctx: &HandlerContext<'_>) {
        self.0.process(ctx);
    }
}

impl std::fmt::Debug for DecodedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DecodedPayload")
    }
}

/// Handler that deserializes the payload into `T`
pub struct TypedHandler<T> {
    name: &'static str,
    processor: Processor<T>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TypedHandler<T> {
    #[must_use]
    pub fn new(name: &'static str, processor: Processor<T>) -> Self {
        Self {
            name,
            processor,
            _payload: PhantomData,
        }
    }
}

impl<T> GatewayHandler for TypedHandler<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, raw: Option<&Value>) -> Result<DecodedPayload, DecodeError> {
        let payload = decode_named(self.name, raw)?;

        Ok(DecodedPayload(Box::new(Typed {
            payload,
            processor: self.processor,
        })))
    }
}

/// Handler for events without a body; decoding never fails
pub struct EmptyHandler {
    name: &'static str,
    processor: EmptyProcessor,
}

impl EmptyHandler {
    #[must_use]
    pub fn new(name: &'static str, processor: EmptyProcessor) -> Self {
        Self { name, processor }
    }
}

impl GatewayHandler for EmptyHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, _raw: Option<&Value>) -> Result<DecodedPayload, DecodeError> {
        Ok(DecodedPayload(Box::new(Empty {
            processor: self.processor,
        })))
    }
}

/// Immutable table of handlers, shared by every shard
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn GatewayHandler>>,
}

impl HandlerRegistry {
    /// Start from an empty table
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    pub fn get(&self, event_type: GatewayEventType) -> Option<&Arc<dyn GatewayHandler>> {
        self.lookup(event_type.as_str())
    }

    /// Handler for a raw dispatch name
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn GatewayHandler>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builder().with_defaults().build()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Builder for [`HandlerRegistry`]; later registrations replace earlier ones
pub struct HandlerRegistryBuilder {
    handlers: HashMap<&'static str, Arc<dyn GatewayHandler>>,
}

impl HandlerRegistryBuilder {
    /// Register a prebuilt handler under its own name
    #[must_use]
    pub fn register(mut self, handler: Arc<dyn GatewayHandler>) -> Self {
        self.handlers.insert(handler.name(), handler);
        self
    }

    /// Register a processor for a payload type
    #[must_use]
    pub fn handler<T>(self, event_type: GatewayEventType, processor: Processor<T>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.named(event_type.as_str(), processor)
    }

    /// Register a processor under a raw dispatch name
    #[must_use]
    pub fn named<T>(self, name: &'static str, processor: Processor<T>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.register(Arc::new(TypedHandler::new(name, processor)))
    }

    /// Register a processor for an event without a body
    #[must_use]
    pub fn empty(self, event_type: GatewayEventType, processor: EmptyProcessor) -> Self {
        self.register(Arc::new(EmptyHandler::new(event_type.as_str(), processor)))
    }

    /// Add the built-in handler table
    #[must_use]
    pub fn with_defaults(self) -> Self {
        use super::{channel, guild, member, message, session};
        use GatewayEventType as T;

        self.handler(T::Ready, session::on_ready)
            .empty(T::Resumed, session::on_resumed)
            .handler(T::GuildCreate, guild::on_guild_create)
            .handler(T::GuildUpdate, guild::on_guild_update)
            .handler(T::GuildDelete, guild::on_guild_delete)
            .handler(T::ChannelCreate, channel::on_channel_create)
            .handler(T::ChannelUpdate, channel::on_channel_update)
            .handler(T::ChannelDelete, channel::on_channel_delete)
            .handler(T::TypingStart, channel::on_typing_start)
            .handler(T::MessageCreate, message::on_message_create)
            .handler(T::MessageUpdate, message::on_message_update)
            .handler(T::MessageDelete, message::on_message_delete)
            .handler(T::GuildMemberAdd, member::on_member_add)
            .handler(T::GuildMemberUpdate, member::on_member_update)
            .handler(T::GuildMemberRemove, member::on_member_remove)
            .handler(T::GuildMembersChunk, member::on_members_chunk)
            .handler(T::StageInstanceCreate, guild::on_stage_instance_create)
            .handler(T::StageInstanceUpdate, guild::on_stage_instance_update)
            .handler(T::StageInstanceDelete, guild::on_stage_instance_delete)
            .handler(T::GuildScheduledEventUserAdd, guild::on_scheduled_event_user_add)
            .handler(
                T::GuildScheduledEventUserRemove,
                guild::on_scheduled_event_user_remove,
            )
    }

    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

/// Decode a payload the same way registered handlers do, for code outside the table
pub(crate) fn decode_as<T: DeserializeOwned>(
    event_type: GatewayEventType,
    raw: Option<&Value>,
) -> Result<T, DecodeError> {
    decode_named(event_type.as_str(), raw)
}

fn decode_named<T: DeserializeOwned>(
    name: &'static str,
    raw: Option<&Value>,
) -> Result<T, DecodeError> {
    let null = Value::Null;
    T::deserialize(raw.unwrap_or(&null)).map_err(|source| DecodeError {
        event_type: name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_default_table_covers_every_event_type() {
        let registry = HandlerRegistry::default();
        assert_eq!(registry.len(), GatewayEventType::ALL.len());
        for event_type in GatewayEventType::ALL {
            let handler = registry.lookup(event_type.as_str()).unwrap();
            assert_eq!(handler.name(), event_type.as_str());
            assert_eq!(handler.event_type(), Some(event_type));
        }
    }

    #[test]
    fn test_decode_failure_names_the_event() {
        let registry = HandlerRegistry::default();
        let handler = registry.get(GatewayEventType::MessageCreate).unwrap();

        let err = handler.decode(Some(&json!({"id": "not a number"}))).unwrap_err();
        assert_eq!(err.event_type, "MESSAGE_CREATE");

        assert!(handler.decode(None).is_err());
    }

    #[test]
    fn test_empty_handler_ignores_payload() {
        let registry = HandlerRegistry::default();
        let handler = registry.get(GatewayEventType::Resumed).unwrap();
        assert!(handler.decode(None).is_ok());
        assert!(handler.decode(Some(&json!({"_trace": ["x"]}))).is_ok());
    }

    static SEEN: Mutex<Vec<(u32, u64, String)>> = parking_lot::const_mutex(Vec::new());

    #[derive(Deserialize)]
    struct Custom {
        value: String,
    }

    fn record_custom(ctx: &HandlerContext<'_>, payload: Custom) {
        SEEN.lock().push((ctx.shard_id(), ctx.sequence(), payload.value));
    }

    #[test]
    fn test_builder_replaces_entries() {
        let registry = HandlerRegistry::builder()
            .with_defaults()
            .handler(GatewayEventType::TypingStart, record_custom)
            .build();
        assert_eq!(registry.len(), GatewayEventType::ALL.len());

        let client = Client::builder().build();
        let ctx = HandlerContext::new(&client, 3, 99);
        registry
            .get(GatewayEventType::TypingStart)
            .unwrap()
            .decode(Some(&json!({"value": "hi"})))
            .unwrap()
            .process(&ctx);

        assert_eq!(*SEEN.lock(), vec![(3, 99, "hi".to_string())]);
    }

    #[test]
    fn test_empty_builder() {
        let registry = HandlerRegistry::builder().build();
        assert!(registry.is_empty());
        assert!(!registry.contains("READY"));
    }

    static RAW: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

    fn record_raw(_ctx: &HandlerContext<'_>, payload: Custom) {
        RAW.lock().push(payload.value);
    }

    #[test]
    fn test_named_handler_for_unknown_event() {
        let registry = HandlerRegistry::builder()
            .with_defaults()
            .named("AUTO_MODERATION_ACTION", record_raw)
            .build();
        assert_eq!(registry.len(), GatewayEventType::ALL.len() + 1);
        assert!(registry.contains("AUTO_MODERATION_ACTION"));

        let handler = registry.lookup("AUTO_MODERATION_ACTION").unwrap();
        assert_eq!(handler.event_type(), None);
        assert!(registry.lookup("auto_moderation_action").is_none());

        let err = handler.decode(Some(&json!({"value": 1}))).unwrap_err();
        assert_eq!(err.event_type, "AUTO_MODERATION_ACTION");

        let client = Client::builder().build();
        handler
            .decode(Some(&json!({"value": "blocked"})))
            .unwrap()
            .process(&HandlerContext::new(&client, 0, 5));
        assert_eq!(*RAW.lock(), vec!["blocked".to_string()]);
    }
}
