// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Client Integration Tests
//!
//! Drives the connection manager, subscription controller and event loop
//! together over a scripted transport on a paused clock.
//!
//! ## Test Categories
//!
//! - `test_connect_*`: Fixed-delay retry behaviour
//! - `test_subscribe_*`: Subscription and monitored item setup
//! - `test_run_*`: Event loop, shutdown and connection loss
//! - `test_time_*`: Current time formatting

use std::time::Duration;

use tokio::time::Instant;
use tracing_test::traced_test;

use uaclock_opcua::client::{
    describe_current_time, ConnectOutcome, CurrentTimeLogger, LoopExit,
};
use uaclock_opcua::error::{ConnectionError, OpcUaError, SubscriptionError};

use uaclock_tests::common::{ClientHarness, ConfigFixtures, TransportCall, ValueFixtures};

// =============================================================================
// Connection Manager
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_three_failures_then_success() {
    let mut h = ClientHarness::new();
    h.script.fail_connects(3);

    let start = Instant::now();
    let outcome = h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    assert_eq!(outcome, ConnectOutcome::Connected { attempts: 4 });
    assert_eq!(h.script.connect_calls(), 4);
    // Three retry waits of one second each.
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(start.elapsed() < Duration::from_secs(4));
    assert!(h.client.is_operational());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_connect_logs_three_retries_then_success() {
    let mut h = ClientHarness::new();
    h.script.fail_connects(3);

    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
    h.controller.setup(&mut h.client).await.unwrap();

    logs_assert(|lines: &[&str]| {
        let count = |needle: &str| lines.iter().filter(|line| line.contains(needle)).count();
        match (
            count("Not connected. Retrying to connect in 1 second"),
            count("Connected to opc.tcp://plc.test:4840"),
            count("Create subscription succeeded, id"),
        ) {
            (3, 1, 1) => Ok(()),
            other => Err(format!("unexpected (retries, connected, subscribed): {:?}", other)),
        }
    });
}

#[tokio::test(start_paused = true)]
async fn test_connect_uses_configured_endpoint() {
    let mut h = ClientHarness::new();

    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    assert_eq!(
        h.script.calls(),
        vec![TransportCall::Connect(ConfigFixtures::ENDPOINT.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_connect_unbounded_by_default() {
    let mut h = ClientHarness::new();
    h.script.fail_connects(50);

    let outcome = h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    assert!(outcome.is_connected());
    assert_eq!(h.script.connect_calls(), 51);
    assert_eq!(h.manager.stats().failures(), 50);
}

#[tokio::test(start_paused = true)]
async fn test_connect_attempt_limit() {
    let mut h = ClientHarness::with_config(ConfigFixtures::limited_attempts(3));
    h.script.fail_connects(10);

    let err = h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap_err();

    assert!(matches!(
        err,
        OpcUaError::Connection(ConnectionError::RetriesExhausted { attempts: 3, .. })
    ));
    assert_eq!(h.script.connect_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_connect_cancelled_during_retry_wait() {
    let mut h = ClientHarness::with_config(ConfigFixtures::with_retry_delay(
        Duration::from_secs(30),
    ));
    h.script.fail_connects(u32::MAX);

    let trigger = h.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.initiate_shutdown();
    });

    let start = Instant::now();
    let outcome = h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    assert_eq!(outcome, ConnectOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(h.script.connect_calls(), 1);
}

// =============================================================================
// Subscription Controller
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_subscribe_one_subscription_one_item() {
    let mut h = ClientHarness::new();
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    h.controller.setup(&mut h.client).await.unwrap();

    assert_eq!(h.script.subscription_calls(), 1);
    assert_eq!(h.script.monitored_item_calls(), 1);
    assert!(h.controller.is_active());
    assert_eq!(h.client.monitored_item_count(), 1);

    let calls = h.script.calls();
    assert!(calls.contains(&TransportCall::CreateMonitoredItem {
        subscription_id: h.controller.subscription_id().unwrap().value(),
        node: "i=2258".to_string(),
    }));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_custom_node() {
    let mut h = ClientHarness::with_config(ConfigFixtures::custom_node());
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    h.controller.setup(&mut h.client).await.unwrap();

    assert_eq!(
        h.script.count(|c| matches!(
            c,
            TransportCall::CreateMonitoredItem { node, .. } if node == "ns=2;s=Line1.Clock"
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_failure_skips_monitored_item() {
    let mut h = ClientHarness::new();
    h.script.fail_subscriptions(1);
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    let err = h.controller.setup(&mut h.client).await.unwrap_err();

    assert!(matches!(
        err,
        OpcUaError::Subscription(SubscriptionError::CreationFailed { .. })
    ));
    assert_eq!(h.script.subscription_calls(), 1);
    assert_eq!(h.script.monitored_item_calls(), 0);
    assert!(h.controller.subscription_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_monitored_item_failure_keeps_subscription() {
    let mut h = ClientHarness::new();
    h.script.fail_monitored_items(1);
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    let err = h.controller.setup(&mut h.client).await.unwrap_err();

    assert!(matches!(
        err,
        OpcUaError::Subscription(SubscriptionError::MonitoredItemFailed { .. })
    ));
    assert!(h.controller.subscription_id().is_some());
    assert!(!h.controller.is_active());

    // The subscription still exists on the server and is deleted on teardown.
    assert!(h.controller.teardown(&mut h.client).await.unwrap());
    assert_eq!(h.script.deleted_subscriptions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_rejected_while_disconnected() {
    let mut h = ClientHarness::new();

    assert!(h.controller.setup(&mut h.client).await.is_err());
    assert_eq!(h.script.subscription_calls(), 0);
}

// =============================================================================
// Event Loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_logs_values_until_shutdown() {
    let mut h = ClientHarness::new();
    h.script.emit_values(true).shutdown_on_iteration(5, &h.shutdown);
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();

    let logger = CurrentTimeLogger::new();
    h.controller
        .setup_with(&mut h.client, logger.clone())
        .await
        .unwrap();

    let exit = h.event_loop.run(&mut h.client, &h.shutdown.token()).await;

    assert_eq!(exit, LoopExit::Shutdown);
    assert_eq!(h.script.iterations(), 5);
    assert_eq!(logger.logged(), 5);
    assert_eq!(h.client.stats().data_changes(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_run_shutdown_then_delete_then_disconnect() {
    let mut h = ClientHarness::new();
    h.script.shutdown_on_iteration(2, &h.shutdown);
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
    h.controller.setup(&mut h.client).await.unwrap();
    let subscription_id = h.controller.subscription_id().unwrap().value();

    let exit = h.event_loop.run(&mut h.client, &h.shutdown.token()).await;
    assert_eq!(exit, LoopExit::Shutdown);

    assert!(h.controller.teardown(&mut h.client).await.unwrap());
    h.client.disconnect().await.unwrap();

    let calls = h.script.calls();
    let tail: Vec<_> = calls.iter().rev().take(2).rev().cloned().collect();
    assert_eq!(
        tail,
        vec![
            TransportCall::DeleteSubscription(subscription_id),
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(h.script.iterations(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_shutdown_latency_one_iteration() {
    let mut h = ClientHarness::new();
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
    h.controller.setup(&mut h.client).await.unwrap();

    let trigger = h.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.initiate_shutdown();
    });

    let start = Instant::now();
    let exit = h.event_loop.run(&mut h.client, &h.shutdown.token()).await;

    assert_eq!(exit, LoopExit::Shutdown);
    assert!(start.elapsed() <= Duration::from_millis(2500));
    assert_eq!(h.script.iterations(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_connection_loss_then_resubscribe() {
    let mut h = ClientHarness::new();
    h.script.lose_connection_after(3);
    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
    h.controller.setup(&mut h.client).await.unwrap();

    let exit = h.event_loop.run(&mut h.client, &h.shutdown.token()).await;
    assert_eq!(exit, LoopExit::ConnectionLost);
    assert_eq!(h.client.monitored_item_count(), 0);

    h.controller.invalidate();
    h.client.disconnect().await.unwrap();

    h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
    h.controller.setup(&mut h.client).await.unwrap();

    assert_eq!(h.script.connect_calls(), 2);
    assert_eq!(h.script.subscription_calls(), 2);
    assert_eq!(h.script.monitored_item_calls(), 2);
    assert!(h.script.deleted_subscriptions().is_empty());
    assert_eq!(h.client.monitored_item_count(), 1);
}

// =============================================================================
// Current Time Formatting
// =============================================================================

#[test]
fn test_time_known_value_format() {
    assert_eq!(
        describe_current_time(&ValueFixtures::known_time()).as_deref(),
        Some(ValueFixtures::KNOWN_TEXT)
    );
}

#[test]
fn test_time_wrong_type_is_ignored() {
    assert_eq!(describe_current_time(&ValueFixtures::not_a_time()), None);
}
