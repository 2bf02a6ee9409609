//! Test helpers for integration tests
//!
//! Provides an in-process gateway that accepts WebSocket connections and
//! hands each one to the test, plus event recording for the client side.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chat_client::protocol::{GatewayMessage, OpCode};
use chat_client::{Client, Event};
use chat_common::GatewayConfig;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// How long any single step may take before the test fails
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Local gateway accepting client connections
pub struct TestGateway {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<GatewayConn>,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Bind to an ephemeral port and start accepting
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let (tx, connections) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => {
                        if tx.send(GatewayConn { ws }).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("WebSocket handshake failed: {e}"),
                }
            }
        });

        Ok(Self {
            addr,
            connections,
            _handle: handle,
        })
    }

    /// Base URL without query
    pub fn base_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// URL clients are configured with
    pub fn url(&self) -> String {
        format!("ws://{}/?v=10&encoding=json", self.addr)
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Result<GatewayConn> {
        tokio::time::timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .context("no connection in time")?
            .ok_or_else(|| anyhow!("gateway stopped accepting"))
    }
}

/// Server side of one client connection
pub struct GatewayConn {
    ws: WebSocketStream<TcpStream>,
}

impl GatewayConn {
    pub async fn send(&mut self, message: &GatewayMessage) -> Result<()> {
        self.ws.send(Message::Text(message.to_json()?)).await?;
        Ok(())
    }

    /// Next frame from the client that is not a heartbeat
    pub async fn recv(&mut self) -> Result<GatewayMessage> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("no frame in time")?
                .ok_or_else(|| anyhow!("connection ended"))??;

            match message {
                Message::Text(text) => {
                    let frame = GatewayMessage::from_json(&text)?;
                    if frame.op != OpCode::Heartbeat {
                        return Ok(frame);
                    }
                }
                Message::Close(frame) => bail!("client closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Wait for the client's close frame and return its code
    pub async fn recv_close(&mut self) -> Result<u16> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("no close in time")?
                .ok_or_else(|| anyhow!("connection ended without close frame"))??;

            if let Message::Close(frame) = message {
                return frame
                    .map(|frame| u16::from(frame.code))
                    .ok_or_else(|| anyhow!("close frame without code"));
            }
        }
    }

    /// Close with `code`
    pub async fn close(mut self, code: u16) -> Result<()> {
        self.ws
            .close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            }))
            .await?;
        Ok(())
    }
}

/// Configuration pointing at `gateway` with short timers
pub fn test_config(gateway: &TestGateway) -> GatewayConfig {
    let mut config = GatewayConfig::new("integration-token");
    config.url = gateway.url();
    config.identify_spacing_ms = 0;
    config.backoff.base_ms = 20;
    config.backoff.max_ms = 200;
    config.backoff.jitter = 0.0;
    config.shutdown_timeout_ms = 2_000;
    config
}

/// Events received by a client, in delivery order
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    /// Client recording into this log
    pub fn client(&self) -> Arc<Client> {
        let events = self.events.clone();
        Client::builder()
            .listener(Arc::new(move |event: &Event| events.lock().push(event.clone())))
            .build()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.events.lock().iter().map(Event::sequence).collect()
    }

    /// Wait until `count` events were recorded
    pub async fn wait_for(&self, count: usize) -> Result<()> {
        tokio::time::timeout(STEP_TIMEOUT, async {
            while self.events.lock().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| format!("expected {count} events, got {:?}", self.names()))
    }
}
