//! Shard manager
//!
//! Owns the shards of one application. Shards are started one after the
//! other, `max_concurrency` at a time with `identify_spacing` between groups,
//! and stopped together.

use super::ratelimit::IdentifyLimiter;
use super::shard::{Shard, ShardContext, ShardExit, ShardHandle, ShardId, ShardSettings};
use super::state::ConnectionStatus;
use super::transport::Connector;
use crate::client::Client;
use crate::error::{GatewayError, ShutdownError};
use crate::handlers::HandlerRegistry;
use chat_common::{ConfigError, GatewayConfig};
use chat_core::Snowflake;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Aggregate state of all managed shards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "shards")]
pub enum ManagerStatus {
    /// `start` has not been called
    Idle,
    /// Not every configured shard has been spawned yet
    Starting,
    AllConnected,
    /// Shards that are running but not connected right now
    Reconnecting(Vec<u32>),
    /// Shards stopped by a fatal close
    Failed(Vec<u32>),
    ShutDown,
}

/// Starts, observes and stops a set of shards
pub struct ShardManager {
    ctx: ShardContext,
    shard_count: u32,
    shard_ids: Vec<u32>,
    identify_spacing: Duration,
    max_concurrency: u32,
    shutdown_timeout: Duration,
    shards: RwLock<BTreeMap<u32, Arc<ShardHandle>>>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl ShardManager {
    /// Create a manager for the shards named by `config`
    ///
    /// # Errors
    ///
    /// Returns the validation error of an inconsistent configuration.
    pub fn new(
        client: Arc<Client>,
        config: &GatewayConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let ctx = ShardContext {
            settings: Arc::new(ShardSettings::from_config(config)),
            client,
            registry: Arc::new(HandlerRegistry::default()),
            connector,
            limiter: Arc::new(IdentifyLimiter::new(
                config.identify_spacing(),
                config.max_concurrency,
            )),
        };

        Ok(Self {
            ctx,
            shard_count: config.shard_count,
            shard_ids: config.effective_shard_ids(),
            identify_spacing: config.identify_spacing(),
            max_concurrency: config.max_concurrency.max(1),
            shutdown_timeout: config.shutdown_timeout(),
            shards: RwLock::new(BTreeMap::new()),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the default handler table
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.ctx.registry = registry;
        self
    }

    /// Adjust shard settings (presence, identify properties) before `start`
    #[must_use]
    pub fn with_settings(mut self, configure: impl FnOnce(&mut ShardSettings)) -> Self {
        configure(Arc::make_mut(&mut self.ctx.settings));
        self
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.ctx.client
    }

    pub const fn shard_count(&self) -> u32 {
        self.shard_count
    }

    pub fn shard_ids(&self) -> &[u32] {
        &self.shard_ids
    }

    /// Spawn every configured shard
    ///
    /// Returns once all shards are spawned, not once they are connected.
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cancelled`] when `shutdown` interrupts the
    /// staggered start; shards spawned so far are stopped by that shutdown.
    pub async fn start(&self) -> Result<(), GatewayError> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!("Shard manager already started");
            return Ok(());
        }

        tracing::info!(
            shard_count = self.shard_count,
            shards = ?self.shard_ids,
            max_concurrency = self.max_concurrency,
            "Starting shards"
        );

        for (position, &index) in self.shard_ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let first_of_group = position > 0 && position % self.max_concurrency as usize == 0;
            if first_of_group && !self.identify_spacing.is_zero() {
                tracing::debug!(
                    shard_id = index,
                    delay_ms = self.identify_spacing.as_millis() as u64,
                    "Waiting before next shard group"
                );
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        tracing::info!(shard_id = index, "Shard start aborted");
                        return Err(GatewayError::Cancelled);
                    }
                    () = tokio::time::sleep(self.identify_spacing) => {}
                }
            }

            let id = ShardId::new(index, self.shard_count);
            let handle = Shard::new(id, self.ctx.clone(), self.cancel.child_token()).spawn();
            self.shards.write().insert(index, Arc::new(handle));
        }

        tracing::info!(count = self.shard_ids.len(), "All shards spawned");
        Ok(())
    }

    /// Aggregate status; failed shards take precedence over reconnecting ones
    pub fn status(&self) -> ManagerStatus {
        if self.cancel.is_cancelled() {
            return ManagerStatus::ShutDown;
        }

        let shards = self.shards.read();
        if shards.is_empty() && !self.started.load(Ordering::Acquire) {
            return ManagerStatus::Idle;
        }
        if shards.len() < self.shard_ids.len() {
            return ManagerStatus::Starting;
        }

        let mut failed = Vec::new();
        let mut reconnecting = Vec::new();
        for (&index, handle) in shards.iter() {
            match handle.snapshot().status {
                ConnectionStatus::Connected => {}
                ConnectionStatus::Failed => failed.push(index),
                _ => reconnecting.push(index),
            }
        }

        if !failed.is_empty() {
            ManagerStatus::Failed(failed)
        } else if !reconnecting.is_empty() {
            ManagerStatus::Reconnecting(reconnecting)
        } else {
            ManagerStatus::AllConnected
        }
    }

    pub fn shard(&self, index: u32) -> Option<Arc<ShardHandle>> {
        self.shards.read().get(&index).cloned()
    }

    /// Handles of every spawned shard, by ascending index
    pub fn shards(&self) -> Vec<Arc<ShardHandle>> {
        self.shards.read().values().cloned().collect()
    }

    /// Shard that receives the events of `guild_id`, if this manager runs it
    pub fn shard_for_guild(&self, guild_id: Snowflake) -> Option<Arc<ShardHandle>> {
        self.shard(guild_id.shard_index(self.shard_count))
    }

    /// Stop all shards in parallel and wait for them
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Incomplete`] with the shards still running
    /// once `shutdown_timeout` elapsed.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.cancel.cancel();

        let shards = self.shards();
        tracing::info!(count = shards.len(), "Shutting down shards");

        let waits = shards.iter().map(|handle| async move {
            let exit = handle.wait().await;
            (handle.id(), exit)
        });

        match tokio::time::timeout(self.shutdown_timeout, futures::future::join_all(waits)).await {
            Ok(exits) => {
                for (id, exit) in exits {
                    match exit {
                        Some(ShardExit::Panicked(message)) => {
                            tracing::error!(shard = %id, message = %message, "Shard task panicked");
                        }
                        Some(exit) => {
                            tracing::debug!(shard = %id, shutdown = exit.is_shutdown(), "Shard exited");
                        }
                        None => {}
                    }
                }
                tracing::info!("All shards stopped");
                Ok(())
            }
            Err(_) => {
                let pending: Vec<u32> = shards
                    .iter()
                    .filter(|handle| !handle.is_finished())
                    .map(|handle| handle.id().index)
                    .collect();
                tracing::warn!(pending = ?pending, "Shutdown timed out");
                Err(ShutdownError::Incomplete { pending })
            }
        }
    }
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("shard_count", &self.shard_count)
            .field("shard_ids", &self.shard_ids)
            .field("running", &self.shards.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::transport::mock::{MockConnector, MockRemote};
    use crate::protocol::{GatewayMessage, HelloPayload, OpCode, NORMAL_CLOSURE};
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn config(shard_count: u32, spacing_ms: u64) -> GatewayConfig {
        let mut config = GatewayConfig::new("secret");
        config.url = "wss://gateway.test/?v=10&encoding=json".to_string();
        config.shard_count = shard_count;
        config.identify_spacing_ms = spacing_ms;
        config.backoff.base_ms = 10;
        config.backoff.max_ms = 50;
        config.backoff.jitter = 0.0;
        config
    }

    fn manager(config: &GatewayConfig, connector: &Arc<MockConnector>) -> Arc<ShardManager> {
        let client = Client::builder().build();
        Arc::new(ShardManager::new(client, config, connector.clone()).unwrap())
    }

    async fn identify(remote: &mut MockRemote, session_id: &str) -> serde_json::Value {
        remote.send(&GatewayMessage::hello(HelloPayload::with_interval(45_000)));
        let frame = tokio::time::timeout(WAIT, remote.recv_frame())
            .await
            .expect("identify in time")
            .expect("transport open");
        assert_eq!(frame.op, OpCode::Identify);

        remote.send(&GatewayMessage::dispatch(
            "READY",
            1,
            json!({
                "v": 10,
                "user": {"id": "1", "username": "bot", "bot": true},
                "guilds": [],
                "session_id": session_id
            }),
        ));
        frame.d.unwrap()
    }

    async fn wait_status(manager: &ShardManager, expected: ManagerStatus) {
        tokio::time::timeout(WAIT, async {
            while manager.status() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("status {expected:?}, got {:?}", manager.status()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config(2, 0);
        config.shard_ids = vec![0, 2];
        let result = ShardManager::new(Client::builder().build(), &config, Arc::new(MockConnector::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_all_connected_and_shutdown() {
        let connector = Arc::new(MockConnector::new());
        let mut first = connector.push();
        let mut second = connector.push();
        let manager = manager(&config(2, 20), &connector);
        assert_eq!(manager.status(), ManagerStatus::Idle);

        manager.start().await.unwrap();
        assert_eq!(manager.shards().len(), 2);

        let d = identify(&mut first, "one").await;
        assert_eq!(d["shard"], json!([0, 2]));
        let d = identify(&mut second, "two").await;
        assert_eq!(d["shard"], json!([1, 2]));

        wait_status(&manager, ManagerStatus::AllConnected).await;
        assert_eq!(
            manager.shard(1).unwrap().snapshot().session_id.as_deref(),
            Some("two")
        );

        let guild = Snowflake::new(1 << 22);
        assert_eq!(manager.shard_for_guild(guild).unwrap().id().index, 1);
        assert_eq!(manager.shard_for_guild(Snowflake::new(5)).unwrap().id().index, 0);

        manager.shutdown().await.unwrap();
        assert_eq!(manager.status(), ManagerStatus::ShutDown);
        assert_eq!(first.recv_close().await, Some(NORMAL_CLOSURE));
        assert_eq!(second.recv_close().await, Some(NORMAL_CLOSURE));
        assert!(manager.shards().iter().all(|shard| shard.is_finished()));
    }

    #[tokio::test]
    async fn test_second_start_is_noop() {
        let connector = Arc::new(MockConnector::new());
        let _remote = connector.push();
        let manager = manager(&config(1, 0), &connector);

        manager.start().await.unwrap();
        manager.start().await.unwrap();
        assert_eq!(manager.shards().len(), 1);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_only_configured_shard_ids_run() {
        let connector = Arc::new(MockConnector::new());
        let mut remote = connector.push();
        let mut config = config(4, 0);
        config.shard_ids = vec![2];
        let manager = manager(&config, &connector);

        manager.start().await.unwrap();
        let d = identify(&mut remote, "only").await;
        assert_eq!(d["shard"], json!([2, 4]));
        wait_status(&manager, ManagerStatus::AllConnected).await;

        assert!(manager.shard(0).is_none());
        assert!(manager.shard_for_guild(Snowflake::new(0)).is_none());
        assert_eq!(manager.shard_for_guild(Snowflake::new(2 << 22)).unwrap().id().index, 2);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_fatal_close_reported_as_failed() {
        let connector = Arc::new(MockConnector::new());
        let mut remote = connector.push();
        let manager = manager(&config(1, 0), &connector);

        manager.start().await.unwrap();
        identify(&mut remote, "abc").await;
        wait_status(&manager, ManagerStatus::AllConnected).await;

        remote.close(4004);
        wait_status(&manager, ManagerStatus::Failed(vec![0])).await;
        assert!(manager.shard(0).unwrap().snapshot().failure.is_some());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_lost_connection_reported_as_reconnecting() {
        let connector = Arc::new(MockConnector::new());
        let mut remote = connector.push();
        let manager = manager(&config(1, 0), &connector);

        manager.start().await.unwrap();
        identify(&mut remote, "abc").await;
        wait_status(&manager, ManagerStatus::AllConnected).await;

        // Nothing queued for the reconnect, so the shard keeps retrying
        remote.drop_connection();
        wait_status(&manager, ManagerStatus::Reconnecting(vec![0])).await;

        manager.shutdown().await.unwrap();
        assert_eq!(manager.status(), ManagerStatus::ShutDown);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_staggered_start() {
        let connector = Arc::new(MockConnector::new());
        let _remote = connector.push();
        let manager = manager(&config(2, 60_000), &connector);

        let starting = manager.clone();
        let start = tokio::spawn(async move { starting.start().await });

        tokio::time::timeout(WAIT, async {
            while manager.shards().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(manager.status(), ManagerStatus::Starting);

        manager.shutdown().await.unwrap();
        let result = tokio::time::timeout(WAIT, start).await.unwrap().unwrap();
        assert!(matches!(result, Err(GatewayError::Cancelled)));
        assert_eq!(manager.shards().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_timeout_lists_pending_shards() {
        let entered = Arc::new(tokio::sync::Notify::new());
        let signal = entered.clone();
        // Holds the shard task inside dispatch well past the shutdown timeout
        let client = Client::builder()
            .listener(Arc::new(move |_event: &crate::events::Event| {
                signal.notify_one();
                std::thread::sleep(Duration::from_millis(500));
            }))
            .build();

        let connector = Arc::new(MockConnector::new());
        let mut remote = connector.push();
        let mut config = config(1, 0);
        config.shutdown_timeout_ms = 50;
        let manager = ShardManager::new(client, &config, connector.clone()).unwrap();

        manager.start().await.unwrap();
        identify(&mut remote, "abc").await;
        tokio::time::timeout(WAIT, entered.notified()).await.unwrap();

        let result = manager.shutdown().await;
        assert!(matches!(
            result,
            Err(ShutdownError::Incomplete { ref pending }) if pending == &vec![0]
        ));

        let shard = manager.shard(0).unwrap();
        let exit = tokio::time::timeout(WAIT, shard.wait()).await.unwrap();
        assert!(exit.unwrap().is_shutdown());
    }
}
