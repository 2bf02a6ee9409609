//! Shard session loop
//!
//! One task per shard owns the transport, the heartbeat clock and the
//! session state. Four suspension points are multiplexed in a single
//! `select!`: shutdown, the next heartbeat tick, the next frame and the next
//! outbound command queued through a [`ShardHandle`].

use super::backoff::{self, Backoff};
use super::heartbeat::{next_tick, HeartbeatAction, HeartbeatClock};
use super::ratelimit::IdentifyLimiter;
use super::state::{ConnectionStatus, Handshake, SessionState};
use super::transport::{Connector, Transport, TransportMessage};
use crate::client::Client;
use crate::error::{GatewayError, ProtocolError, TransportError};
use crate::events::GatewayEventType;
use crate::handlers::{decode_as, HandlerContext, HandlerRegistry};
use crate::protocol::{
    CloseAction, CloseCode, CloseCodeTable, GatewayMessage, IdentifyPayload, IdentifyProperties,
    Intents, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload, ResumePayload,
    NORMAL_CLOSURE, RESUMABLE_CLOSURE,
};
use chat_common::{BackoffConfig, GatewayConfig};
use serde::Deserialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Commands a handle may queue before the shard sends them
const COMMAND_BUFFER: usize = 32;

/// Shard identity, fixed for the lifetime of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardId {
    pub index: u32,
    pub count: u32,
}

impl ShardId {
    #[must_use]
    pub const fn new(index: u32, count: u32) -> Self {
        Self { index, count }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.index, self.count)
    }
}

/// Observable state of a shard, published after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSnapshot {
    pub shard: ShardId,
    pub status: ConnectionStatus,
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
    pub resume_url: Option<String>,
    pub latency: Option<Duration>,
    /// Why the shard stopped, once it failed
    pub failure: Option<String>,
}

impl ShardSnapshot {
    fn initial(shard: ShardId) -> Self {
        Self {
            shard,
            status: ConnectionStatus::Disconnected,
            session_id: None,
            last_sequence: None,
            resume_url: None,
            latency: None,
            failure: None,
        }
    }
}

/// Per-shard connection settings derived from [`GatewayConfig`]
#[derive(Debug, Clone)]
pub struct ShardSettings {
    pub token: String,
    pub url: String,
    pub intents: Intents,
    pub large_threshold: u32,
    pub heartbeat_override: Option<Duration>,
    pub backoff: BackoffConfig,
    pub max_protocol_errors: u32,
    pub close_codes: CloseCodeTable,
    pub properties: IdentifyProperties,
    pub presence: Option<PresenceUpdatePayload>,
    /// Pause in milliseconds before reconnecting after INVALID_SESSION
    pub invalid_session_delay_ms: RangeInclusive<u64>,
}

impl ShardSettings {
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            token: config.token.clone(),
            url: config.url.clone(),
            intents: Intents::from_config_bits(config.intents),
            large_threshold: config.large_threshold,
            heartbeat_override: config.heartbeat_interval_override(),
            backoff: config.backoff,
            max_protocol_errors: config.max_protocol_errors,
            close_codes: CloseCodeTable::from_config(config),
            properties: IdentifyProperties::default(),
            presence: None,
            invalid_session_delay_ms: backoff::INVALID_SESSION_DELAY_MS,
        }
    }
}

/// Everything shards of one manager share
#[derive(Clone)]
pub struct ShardContext {
    pub settings: Arc<ShardSettings>,
    pub client: Arc<Client>,
    pub registry: Arc<HandlerRegistry>,
    pub connector: Arc<dyn Connector>,
    pub limiter: Arc<IdentifyLimiter>,
}

impl fmt::Debug for ShardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardContext")
            .field("url", &self.settings.url)
            .field("registry", &self.registry)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// How a shard task ended
#[derive(Debug)]
pub enum ShardExit {
    Shutdown,
    Failed(GatewayError),
    Panicked(String),
}

impl ShardExit {
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// What to do after a connection ended
#[derive(Debug)]
enum ConnectionEnd {
    Reconnect,
    Backoff,
    Delay(Duration),
    Shutdown,
    Fatal(GatewayError),
}

// Subset of READY the session needs
#[derive(Deserialize)]
struct ReadySession {
    session_id: String,
    #[serde(default)]
    resume_gateway_url: Option<String>,
}

/// One gateway session
pub struct Shard {
    id: ShardId,
    ctx: ShardContext,
    state: SessionState,
    heartbeat: Option<HeartbeatClock>,
    backoff: Backoff,
    protocol_errors: u32,
    failure: Option<String>,
    status_tx: watch::Sender<ShardSnapshot>,
    commands: mpsc::Receiver<GatewayMessage>,
    command_tx: mpsc::Sender<GatewayMessage>,
    cancel: CancellationToken,
}

impl Shard {
    #[must_use]
    pub fn new(id: ShardId, ctx: ShardContext, cancel: CancellationToken) -> Self {
        let (status_tx, _) = watch::channel(ShardSnapshot::initial(id));
        let backoff = Backoff::new(ctx.settings.backoff);
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);

        Self {
            id,
            ctx,
            state: SessionState::new(),
            heartbeat: None,
            backoff,
            protocol_errors: 0,
            failure: None,
            status_tx,
            commands,
            command_tx,
            cancel,
        }
    }

    pub const fn id(&self) -> ShardId {
        self.id
    }

    /// Run the shard on its own task
    #[must_use]
    pub fn spawn(self) -> ShardHandle {
        let id = self.id;
        let cancel = self.cancel.clone();
        let status = self.status_tx.subscribe();
        let commands = self.command_tx.clone();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        let task = tokio::spawn(async move {
            let exit = self.run().await;
            flag.store(true, Ordering::Release);
            exit
        });

        ShardHandle {
            id,
            cancel,
            status,
            commands,
            task: Mutex::new(Some(task)),
            finished,
        }
    }

    /// Run until shutdown or a fatal close
    pub async fn run(mut self) -> ShardExit {
        tracing::info!(shard = %self.id, "Shard starting");

        let mut next = ConnectionEnd::Reconnect;
        let exit = loop {
            let wait = match next {
                ConnectionEnd::Shutdown => break ShardExit::Shutdown,
                ConnectionEnd::Fatal(error) => break ShardExit::Failed(error),
                ConnectionEnd::Reconnect => None,
                ConnectionEnd::Backoff => Some(self.backoff.next_delay()),
                ConnectionEnd::Delay(delay) => Some(delay),
            };

            if let Some(delay) = wait {
                tracing::debug!(
                    shard = %self.id,
                    delay_ms = delay.as_millis() as u64,
                    attempt = self.backoff.attempt(),
                    "Waiting before reconnect"
                );
                if !self.sleep(delay).await {
                    break ShardExit::Shutdown;
                }
            }

            next = self.connect_once().await;
        };

        self.heartbeat = None;
        match &exit {
            ShardExit::Failed(error) => {
                tracing::error!(shard = %self.id, error = %error, "Shard failed");
            }
            _ => {
                self.state.shutdown();
                tracing::info!(shard = %self.id, "Shard stopped");
            }
        }
        self.publish();

        exit
    }

    // false when cancelled
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    async fn connect_once(&mut self) -> ConnectionEnd {
        if self.cancel.is_cancelled() {
            return ConnectionEnd::Shutdown;
        }

        if !self.state.can_resume() {
            tokio::select! {
                () = self.cancel.cancelled() => return ConnectionEnd::Shutdown,
                () = self.ctx.limiter.acquire() => {}
            }
        }

        self.state.begin_connect();
        self.publish();

        let url = self.connect_url();
        let connected = tokio::select! {
            () = self.cancel.cancelled() => return ConnectionEnd::Shutdown,
            result = self.ctx.connector.connect(&url) => result,
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(error) => {
                self.report(&error.into());
                self.state.on_connect_failed();
                self.publish();
                return ConnectionEnd::Backoff;
            }
        };

        tracing::info!(
            shard = %self.id,
            url = %url,
            resuming = self.state.can_resume(),
            "Gateway connected"
        );

        let end = self.run_connection(transport.as_mut()).await;

        self.heartbeat = None;
        self.protocol_errors = 0;
        end
    }

    /// Resume URL when resuming, keeping the query of the configured URL
    fn connect_url(&self) -> String {
        let configured = &self.ctx.settings.url;
        match self.state.resume_url() {
            Some(resume) if resume.contains('?') => resume.to_string(),
            Some(resume) => match configured.split_once('?') {
                Some((_, query)) => format!("{}/?{query}", resume.trim_end_matches('/')),
                None => resume.to_string(),
            },
            None => configured.clone(),
        }
    }

    async fn run_connection(&mut self, transport: &mut dyn Transport) -> ConnectionEnd {
        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    if let Err(error) = transport.close(NORMAL_CLOSURE).await {
                        tracing::debug!(shard = %self.id, error = %error, "Close on shutdown failed");
                    }
                    return ConnectionEnd::Shutdown;
                }
                () = next_tick(&mut self.heartbeat) => {
                    if let Some(end) = self.on_heartbeat_tick(transport).await {
                        return end;
                    }
                }
                message = transport.next_message() => {
                    if let Some(end) = self.on_transport_message(transport, message).await {
                        return end;
                    }
                }
                // Commands wait in the queue until the session is ready
                Some(command) = self.commands.recv(),
                    if self.state.status() == ConnectionStatus::Connected =>
                {
                    if let Err(error) = send(transport, &command).await {
                        return self.on_transport_error(error);
                    }
                    tracing::debug!(shard = %self.id, op = %command.op, "Command sent");
                }
            }
        }
    }

    async fn on_heartbeat_tick(&mut self, transport: &mut dyn Transport) -> Option<ConnectionEnd> {
        let clock = self.heartbeat.as_ref()?;

        match clock.on_tick() {
            HeartbeatAction::Dead => {
                let interval = clock.interval();
                self.report(&GatewayError::HeartbeatTimeout { interval });
                // The remote is gone; no close handshake
                self.state.on_heartbeat_timeout();
                self.publish();
                Some(ConnectionEnd::Reconnect)
            }
            HeartbeatAction::Send => match self.send_heartbeat(transport, true).await {
                Ok(()) => None,
                Err(error) => Some(self.on_transport_error(error)),
            },
        }
    }

    async fn send_heartbeat(
        &mut self,
        transport: &mut dyn Transport,
        track: bool,
    ) -> Result<(), TransportError> {
        let seq = self.state.last_sequence();
        send(transport, &GatewayMessage::heartbeat(seq)).await?;

        if track {
            if let Some(clock) = self.heartbeat.as_mut() {
                clock.record_sent();
            }
        }
        tracing::trace!(shard = %self.id, seq = ?seq, requested = !track, "Heartbeat sent");
        Ok(())
    }

    async fn on_transport_message(
        &mut self,
        transport: &mut dyn Transport,
        message: Option<Result<TransportMessage, TransportError>>,
    ) -> Option<ConnectionEnd> {
        match message {
            None => Some(self.on_closed(None, String::new())),
            Some(Err(error)) => Some(self.on_transport_error(error)),
            Some(Ok(TransportMessage::Close(info))) => Some(match info {
                Some(info) => self.on_closed(Some(info.code), info.reason),
                None => self.on_closed(None, String::new()),
            }),
            Some(Ok(TransportMessage::Text(text))) => {
                self.on_frame(transport, GatewayMessage::from_json(&text)).await
            }
            Some(Ok(TransportMessage::Binary(bytes))) => {
                self.on_frame(transport, GatewayMessage::from_bytes(&bytes)).await
            }
        }
    }

    async fn on_frame(
        &mut self,
        transport: &mut dyn Transport,
        parsed: Result<GatewayMessage, ProtocolError>,
    ) -> Option<ConnectionEnd> {
        let frame = match parsed {
            Ok(frame) => frame,
            Err(error) => return self.on_protocol_error(transport, error).await,
        };

        tracing::trace!(
            shard = %self.id,
            op = %frame.op,
            t = ?frame.t,
            seq = ?frame.s,
            "Frame received"
        );

        let op = frame.op;
        let result = match op {
            OpCode::Hello => self.on_hello(transport, &frame).await,
            OpCode::Dispatch => self.on_dispatch(frame),
            OpCode::HeartbeatAck => {
                self.on_heartbeat_ack();
                Ok(None)
            }
            OpCode::Heartbeat => self
                .send_heartbeat(transport, false)
                .await
                .map(|()| None)
                .map_err(GatewayError::from),
            OpCode::Reconnect => Ok(Some(self.on_reconnect_request(transport).await)),
            OpCode::InvalidSession => {
                Ok(Some(self.on_invalid_session(transport, frame.is_resumable()).await))
            }
            op => Err(ProtocolError::UnexpectedOpCode(op).into()),
        };

        match result {
            Ok(end) => {
                self.protocol_errors = 0;
                end
            }
            Err(GatewayError::Protocol(error)) => self.on_protocol_error(transport, error).await,
            Err(GatewayError::Transport(error)) => Some(self.on_transport_error(error)),
            Err(error) => {
                self.report(&error);
                None
            }
        }
    }

    async fn on_hello(
        &mut self,
        transport: &mut dyn Transport,
        frame: &GatewayMessage,
    ) -> Result<Option<ConnectionEnd>, GatewayError> {
        let hello = frame.as_hello()?;
        let interval = self
            .ctx
            .settings
            .heartbeat_override
            .unwrap_or_else(|| Duration::from_millis(hello.heartbeat_interval));
        self.heartbeat = Some(HeartbeatClock::jittered(interval));

        let handshake = self.state.on_hello();
        self.publish();

        match handshake {
            Handshake::Identify => {
                let payload = self.identify_payload();
                tracing::debug!(
                    shard = %self.id,
                    intents = payload.intents.bits(),
                    heartbeat_ms = interval.as_millis() as u64,
                    "Identifying"
                );
                send(transport, &GatewayMessage::identify(&payload)?).await?;
            }
            Handshake::Resume {
                session_id,
                sequence,
            } => {
                tracing::debug!(
                    shard = %self.id,
                    session_id = %session_id,
                    seq = ?sequence,
                    heartbeat_ms = interval.as_millis() as u64,
                    "Resuming"
                );
                let payload = ResumePayload {
                    token: self.ctx.settings.token.clone(),
                    session_id,
                    seq: sequence,
                };
                send(transport, &GatewayMessage::resume(&payload)?).await?;
            }
        }

        Ok(None)
    }

    fn identify_payload(&self) -> IdentifyPayload {
        let settings = &self.ctx.settings;
        let mut payload = IdentifyPayload::new(settings.token.clone(), settings.intents)
            .with_shard(self.id.index, self.id.count)
            .with_large_threshold(settings.large_threshold);
        payload.properties = settings.properties.clone();
        if let Some(presence) = &settings.presence {
            payload = payload.with_presence(presence.clone());
        }
        payload
    }

    fn on_dispatch(&mut self, frame: GatewayMessage) -> Result<Option<ConnectionEnd>, GatewayError> {
        let name = frame.t.as_deref().ok_or(ProtocolError::MissingEventType)?;
        let sequence = frame.s;

        let Some(handler) = self.ctx.registry.lookup(name).cloned() else {
            tracing::trace!(shard = %self.id, event = name, "No handler for event");
            if let Some(seq) = sequence {
                self.state.observe_sequence(seq);
                self.publish();
            }
            return Ok(None);
        };
        let event_type = handler.event_type();

        let payload = match handler.decode(frame.d.as_ref()) {
            Ok(payload) => payload,
            Err(error) => {
                self.report(&error.into());
                return Ok(None);
            }
        };

        if let Some(seq) = sequence {
            self.state.observe_sequence(seq);
        }
        match event_type {
            Some(GatewayEventType::Ready) => self.on_ready(frame.d.as_ref()),
            Some(GatewayEventType::Resumed) => {
                self.state.on_resumed();
                self.backoff.reset();
                tracing::info!(shard = %self.id, seq = ?self.state.last_sequence(), "Session resumed");
            }
            _ => {}
        }
        self.publish();

        let sequence = sequence.or(self.state.last_sequence()).unwrap_or_default();
        let handler_ctx = HandlerContext::new(&self.ctx.client, self.id.index, sequence);
        payload.process(&handler_ctx);

        Ok(None)
    }

    fn on_ready(&mut self, raw: Option<&serde_json::Value>) {
        match decode_as::<ReadySession>(GatewayEventType::Ready, raw) {
            Ok(ready) => {
                tracing::info!(
                    shard = %self.id,
                    session_id = %ready.session_id,
                    "Session ready"
                );
                self.state.on_ready(ready.session_id, ready.resume_gateway_url);
                self.backoff.reset();
            }
            Err(error) => self.report(&error.into()),
        }
    }

    fn on_heartbeat_ack(&mut self) {
        if let Some(clock) = self.heartbeat.as_mut() {
            clock.acknowledge();
            tracing::trace!(
                shard = %self.id,
                latency_ms = clock.latency().map(|l| l.as_millis() as u64),
                "Heartbeat acknowledged"
            );
        }
        self.publish();
    }

    async fn on_reconnect_request(&mut self, transport: &mut dyn Transport) -> ConnectionEnd {
        tracing::info!(shard = %self.id, "Remote requested reconnect");
        close_for_resume(transport).await;
        self.state.on_reconnect_request();
        self.publish();
        ConnectionEnd::Reconnect
    }

    async fn on_invalid_session(
        &mut self,
        transport: &mut dyn Transport,
        resumable: bool,
    ) -> ConnectionEnd {
        tracing::info!(shard = %self.id, resumable, "Session invalidated");
        close_for_resume(transport).await;
        self.state.on_invalid_session(resumable);
        self.publish();

        let delay = backoff::random_delay(self.ctx.settings.invalid_session_delay_ms.clone());
        ConnectionEnd::Delay(delay)
    }

    async fn on_protocol_error(
        &mut self,
        transport: &mut dyn Transport,
        error: ProtocolError,
    ) -> Option<ConnectionEnd> {
        self.protocol_errors += 1;
        self.report(&error.into());

        if self.protocol_errors > self.ctx.settings.max_protocol_errors {
            tracing::warn!(
                shard = %self.id,
                errors = self.protocol_errors,
                "Too many protocol errors, reconnecting"
            );
            close_for_resume(transport).await;
            self.state.on_reconnect_request();
            self.publish();
            return Some(ConnectionEnd::Reconnect);
        }
        None
    }

    fn on_transport_error(&mut self, error: TransportError) -> ConnectionEnd {
        self.report(&error.into());
        self.state.on_close(CloseAction::Resume);
        self.publish();
        if self.state.can_resume() {
            ConnectionEnd::Reconnect
        } else {
            ConnectionEnd::Backoff
        }
    }

    fn on_closed(&mut self, code: Option<u16>, reason: String) -> ConnectionEnd {
        let action = self.ctx.settings.close_codes.classify(code);
        tracing::info!(
            shard = %self.id,
            code = ?code,
            reason = %reason,
            action = ?action,
            "Gateway connection closed"
        );

        let resumable = self.state.can_resume();
        self.state.on_close(action);

        let end = match action {
            CloseAction::Resume if resumable => ConnectionEnd::Reconnect,
            CloseAction::Resume | CloseAction::Reidentify => ConnectionEnd::Backoff,
            CloseAction::Fatal => {
                let code = code.unwrap_or_default();
                let reason = if reason.is_empty() {
                    CloseCode::from_u16(code)
                        .map_or("Unknown close code", CloseCode::description)
                        .to_string()
                } else {
                    reason
                };
                let error = if code == CloseCode::AuthenticationFailed.as_u16() {
                    GatewayError::Auth { code, reason }
                } else {
                    GatewayError::Fatal { code, reason }
                };
                self.report(&error);
                self.failure = Some(error.to_string());
                ConnectionEnd::Fatal(error)
            }
        };

        self.publish();
        end
    }

    fn report(&self, error: &GatewayError) {
        self.ctx.client.reporter().report(self.id.index, error);
    }

    fn snapshot(&self) -> ShardSnapshot {
        ShardSnapshot {
            shard: self.id,
            status: self.state.status(),
            session_id: self.state.session_id().map(str::to_string),
            last_sequence: self.state.last_sequence(),
            resume_url: self.state.resume_url().map(str::to_string),
            latency: self.heartbeat.as_ref().and_then(HeartbeatClock::latency),
            failure: self.failure.clone(),
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }
}

impl fmt::Debug for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

async fn send(transport: &mut dyn Transport, message: &GatewayMessage) -> Result<(), TransportError> {
    transport.send(message.to_json()?).await
}

async fn close_for_resume(transport: &mut dyn Transport) {
    if let Err(error) = transport.close(RESUMABLE_CLOSURE).await {
        tracing::debug!(error = %error, "Close before resume failed");
    }
}

/// Control handle of a spawned shard
#[derive(Debug)]
pub struct ShardHandle {
    id: ShardId,
    cancel: CancellationToken,
    status: watch::Receiver<ShardSnapshot>,
    commands: mpsc::Sender<GatewayMessage>,
    task: Mutex<Option<JoinHandle<ShardExit>>>,
    finished: Arc<AtomicBool>,
}

impl ShardHandle {
    pub const fn id(&self) -> ShardId {
        self.id
    }

    /// Latest published state
    pub fn snapshot(&self) -> ShardSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ShardSnapshot> {
        self.status.clone()
    }

    /// Ask the shard to stop; repeated calls have no further effect
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(shard = %self.id, "Shard shutdown requested");
            self.cancel.cancel();
        }
    }

    /// Queue an outbound command for this shard's connection
    ///
    /// Commands are held until the session is connected, then sent in order.
    /// Frames the session loop owns (heartbeat, identify, resume) and
    /// server-only op codes are rejected.
    pub async fn send(&self, message: GatewayMessage) -> Result<(), GatewayError> {
        match message.op {
            OpCode::Heartbeat | OpCode::Identify | OpCode::Resume => {
                return Err(ProtocolError::UnexpectedOpCode(message.op).into());
            }
            op if !op.is_client_op() => return Err(ProtocolError::UnexpectedOpCode(op).into()),
            _ => {}
        }

        self.commands
            .send(message)
            .await
            .map_err(|_| GatewayError::Cancelled)
    }

    pub async fn update_presence(&self, presence: &PresenceUpdatePayload) -> Result<(), GatewayError> {
        self.send(GatewayMessage::presence_update(presence)?).await
    }

    /// Ask for guild members; they arrive as GUILD_MEMBERS_CHUNK dispatches
    pub async fn request_guild_members(
        &self,
        request: &RequestGuildMembersPayload,
    ) -> Result<(), GatewayError> {
        self.send(GatewayMessage::request_guild_members(request)?).await
    }

    /// Wait for the shard task to end
    ///
    /// Only the first caller receives the exit; later callers get `None`
    /// once the task is done. Dropping the future before it resolves keeps
    /// the exit for the next caller.
    pub async fn wait(&self) -> Option<ShardExit> {
        let mut task = self.task.lock().await;
        let result = task.as_mut()?.await;
        task.take();
        Some(match result {
            Ok(exit) => exit,
            Err(error) => ShardExit::Panicked(error.to_string()),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
