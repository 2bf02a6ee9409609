//! Gateway Integration Tests
//!
//! A real shard manager over `tokio-tungstenite` talks to an in-process
//! gateway bound to localhost. No external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;

use chat_client::connection::ShardExit;
use chat_client::protocol::{GatewayMessage, OpCode, NORMAL_CLOSURE, RESUMABLE_CLOSURE};
use chat_client::{ConnectionStatus, GatewayError, ManagerStatus, ShardManager, WebSocketConnector};
use chat_core::Snowflake;
use integration_tests::{fixtures::*, test_config, EventLog, TestGateway, STEP_TIMEOUT};
use serde_json::json;

async fn wait_status(manager: &ShardManager, expected: ManagerStatus) {
    let reached = tokio::time::timeout(STEP_TIMEOUT, async {
        while manager.status() != expected {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "expected {expected:?}, got {:?}", manager.status());
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_identify_dispatch_and_resume() {
    let mut gateway = TestGateway::start().await.expect("Failed to start gateway");
    let log = EventLog::default();
    let manager = ShardManager::new(log.client(), &test_config(&gateway), Arc::new(WebSocketConnector))
        .expect("valid config");
    manager.start().await.unwrap();

    let mut conn = gateway.accept().await.unwrap();
    conn.send(&hello()).await.unwrap();
    let identify = conn.recv().await.unwrap();
    assert_eq!(identify.op, OpCode::Identify);
    let d = identify.d.unwrap();
    assert_eq!(d["token"], "integration-token");
    assert_eq!(d["shard"], json!([0, 1]));

    conn.send(&ready("session-1", 1, &gateway.base_url(), &[100])).await.unwrap();
    conn.send(&guild_create(2, 100, "lobby")).await.unwrap();
    conn.send(&message_create(3, 500, 100, "hello")).await.unwrap();
    log.wait_for(3).await.unwrap();
    assert_eq!(log.names(), vec!["Ready", "GuildReady", "MessageCreate"]);

    let caches = manager.client().caches();
    assert_eq!(caches.guild(Snowflake::new(100)).unwrap().name, "lobby");
    assert!(!caches.is_unavailable(Snowflake::new(100)));
    wait_status(&manager, ManagerStatus::AllConnected).await;

    // Resumable close: the shard comes back on the resume URL with its session
    conn.close(4000).await.unwrap();
    let mut conn = gateway.accept().await.unwrap();
    conn.send(&hello()).await.unwrap();
    let resume = conn.recv().await.unwrap();
    assert_eq!(resume.op, OpCode::Resume);
    let d = resume.d.unwrap();
    assert_eq!(d["session_id"], "session-1");
    assert_eq!(d["seq"], 3);
    assert_eq!(d["token"], "integration-token");

    conn.send(&resumed(4)).await.unwrap();
    log.wait_for(4).await.unwrap();
    assert_eq!(log.names()[3], "Resumed");
    assert_eq!(log.sequences(), vec![1, 2, 3, 4]);

    let snapshot = manager.shard(0).unwrap().snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(snapshot.session_id.as_deref(), Some("session-1"));
    assert_eq!(snapshot.last_sequence, Some(4));

    manager.shutdown().await.unwrap();
    assert_eq!(conn.recv_close().await.unwrap(), NORMAL_CLOSURE);
    assert_eq!(manager.status(), ManagerStatus::ShutDown);
}

#[tokio::test]
async fn test_invalid_session_reidentifies() {
    let mut gateway = TestGateway::start().await.expect("Failed to start gateway");
    let log = EventLog::default();
    let manager = ShardManager::new(log.client(), &test_config(&gateway), Arc::new(WebSocketConnector))
        .expect("valid config")
        .with_settings(|settings| settings.invalid_session_delay_ms = 0..=0);
    manager.start().await.unwrap();

    let mut conn = gateway.accept().await.unwrap();
    conn.send(&hello()).await.unwrap();
    assert_eq!(conn.recv().await.unwrap().op, OpCode::Identify);
    conn.send(&ready("first", 1, &gateway.base_url(), &[])).await.unwrap();
    log.wait_for(1).await.unwrap();

    conn.send(&GatewayMessage::invalid_session(false)).await.unwrap();
    assert_eq!(conn.recv_close().await.unwrap(), RESUMABLE_CLOSURE);

    let mut conn = gateway.accept().await.unwrap();
    conn.send(&hello()).await.unwrap();
    let identify = conn.recv().await.unwrap();
    assert_eq!(identify.op, OpCode::Identify);

    conn.send(&ready("second", 1, &gateway.base_url(), &[])).await.unwrap();
    log.wait_for(2).await.unwrap();
    assert_eq!(log.names(), vec!["Ready", "Ready"]);
    wait_status(&manager, ManagerStatus::AllConnected).await;
    assert_eq!(
        manager.shard(0).unwrap().snapshot().session_id.as_deref(),
        Some("second")
    );

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_auth_failure_stops_shard() {
    let mut gateway = TestGateway::start().await.expect("Failed to start gateway");
    let log = EventLog::default();
    let manager = ShardManager::new(log.client(), &test_config(&gateway), Arc::new(WebSocketConnector))
        .expect("valid config");
    manager.start().await.unwrap();

    let mut conn = gateway.accept().await.unwrap();
    conn.send(&hello()).await.unwrap();
    assert_eq!(conn.recv().await.unwrap().op, OpCode::Identify);
    conn.close(4004).await.unwrap();

    wait_status(&manager, ManagerStatus::Failed(vec![0])).await;
    let shard = manager.shard(0).unwrap();
    let exit = tokio::time::timeout(STEP_TIMEOUT, shard.wait()).await.unwrap();
    assert!(matches!(
        exit,
        Some(ShardExit::Failed(GatewayError::Auth { code: 4004, .. }))
    ));
    assert!(log.names().is_empty());

    manager.shutdown().await.unwrap();
}

// ============================================================================
// Sharding
// ============================================================================

#[tokio::test]
async fn test_two_shards_start_in_order() {
    let mut gateway = TestGateway::start().await.expect("Failed to start gateway");
    let log = EventLog::default();
    let mut config = test_config(&gateway);
    config.shard_count = 2;
    config.identify_spacing_ms = 100;
    let manager = ShardManager::new(log.client(), &config, Arc::new(WebSocketConnector))
        .expect("valid config");
    manager.start().await.unwrap();

    let mut first = gateway.accept().await.unwrap();
    first.send(&hello()).await.unwrap();
    assert_eq!(first.recv().await.unwrap().d.unwrap()["shard"], json!([0, 2]));

    let mut second = gateway.accept().await.unwrap();
    second.send(&hello()).await.unwrap();
    assert_eq!(second.recv().await.unwrap().d.unwrap()["shard"], json!([1, 2]));

    first.send(&ready("zero", 1, &gateway.base_url(), &[])).await.unwrap();
    second.send(&ready("one", 1, &gateway.base_url(), &[])).await.unwrap();
    wait_status(&manager, ManagerStatus::AllConnected).await;

    let guild = Snowflake::new(1 << 22);
    let shard = manager.shard_for_guild(guild).unwrap();
    assert_eq!(shard.snapshot().session_id.as_deref(), Some("one"));

    manager.shutdown().await.unwrap();
    assert_eq!(first.recv_close().await.unwrap(), NORMAL_CLOSURE);
    assert_eq!(second.recv_close().await.unwrap(), NORMAL_CLOSURE);
}
