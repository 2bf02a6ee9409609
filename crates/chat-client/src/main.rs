//! Gateway client entry point
//!
//! Run with:
//! ```bash
//! GATEWAY_TOKEN=... cargo run -p chat-client
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use anyhow::Context;
use chat_client::{Client, Event, EventKind, ShardManager, WebSocketConnector};
use chat_common::{try_init_tracing, GatewayConfig};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Gateway client failed");
        std::process::exit(1);
    }
}

fn log_event(event: &Event) {
    match &event.kind {
        EventKind::Ready { user, session_id, guild_ids, .. } => info!(
            shard_id = event.shard_id(),
            user = %user.username,
            session_id = %session_id,
            guilds = guild_ids.len(),
            "Ready"
        ),
        EventKind::MessageCreate(message) => info!(
            shard_id = event.shard_id(),
            channel_id = %message.channel_id,
            author = %message.author.username,
            "Message received"
        ),
        _ => tracing::debug!(
            shard_id = event.shard_id(),
            seq = event.sequence(),
            event = event.name(),
            "Event"
        ),
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("loading configuration")?;
    info!(
        url = %config.url,
        shard_count = config.shard_count,
        intents = config.intents,
        "Configuration loaded"
    );

    let client = Client::builder().listener(Arc::new(log_event)).build();
    let manager = ShardManager::new(client, &config, Arc::new(WebSocketConnector))
        .context("invalid configuration")?;

    tokio::select! {
        result = manager.start() => result.context("starting shards")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for ctrl-c")?;
            info!("Interrupted during start");
            manager.shutdown().await?;
            return Ok(());
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!(status = ?manager.status(), "Shutting down");

    manager.shutdown().await?;
    Ok(())
}
