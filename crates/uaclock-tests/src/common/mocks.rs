// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Transport
//!
//! A scripted [`UaTransport`] for driving the client components without a
//! server.
//!
//! The transport records every call and takes its failure script from a
//! shared [`ScriptHandle`]. Tests keep a handle clone so they can inspect
//! the recorded calls after the transport has been moved into a client or a
//! runtime.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use uaclock_opcua::client::{
    ChannelState, ClientEvent, ConnectionState, DataValue, MonitoredItemId, MonitoredItemRequest,
    SessionState, SubscriptionId, UaTransport,
};
use uaclock_opcua::error::{ConnectionError, OpcUaError, OpcUaResult, SubscriptionError};
use uaclock_opcua::shutdown::ShutdownCoordinator;
use uaclock_opcua::time::UaDateTime;
use uaclock_opcua::types::{StatusCode, SubscriptionSettings};

// =============================================================================
// Recorded Calls
// =============================================================================

/// One call made against a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `connect` with the given endpoint.
    Connect(String),
    /// `disconnect`.
    Disconnect,
    /// `run_iterate`.
    Iterate,
    /// `create_subscription`.
    CreateSubscription,
    /// `create_monitored_item` with the subscription id and node.
    CreateMonitoredItem {
        /// Target subscription.
        subscription_id: u32,
        /// Monitored node in OPC UA string form.
        node: String,
    },
    /// `delete_subscription` with the subscription id.
    DeleteSubscription(u32),
}

impl TransportCall {
    /// Returns `true` for connect calls.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect(_))
    }
}

// =============================================================================
// Script
// =============================================================================

#[derive(Debug, Default)]
struct Script {
    calls: Vec<TransportCall>,
    connect_failures: u32,
    subscription_failures: u32,
    monitored_item_failures: u32,
    lose_connection_after: Option<u32>,
    shutdown_on_iteration: Option<(u64, ShutdownCoordinator)>,
    emit_values: bool,
    iterations: u64,
    next_id: u32,
}

impl Script {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared control over a [`ScriptedTransport`].
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    inner: Arc<Mutex<Script>>,
}

impl ScriptHandle {
    /// Fails the next `n` connect attempts.
    pub fn fail_connects(&self, n: u32) -> &Self {
        self.inner.lock().connect_failures = n;
        self
    }

    /// Fails the next `n` subscription requests.
    pub fn fail_subscriptions(&self, n: u32) -> &Self {
        self.inner.lock().subscription_failures = n;
        self
    }

    /// Fails the next `n` monitored item requests.
    pub fn fail_monitored_items(&self, n: u32) -> &Self {
        self.inner.lock().monitored_item_failures = n;
        self
    }

    /// Drops the connection once, `n` iterations after the next connect.
    pub fn lose_connection_after(&self, n: u32) -> &Self {
        self.inner.lock().lose_connection_after = Some(n);
        self
    }

    /// Requests shutdown on `coordinator` during the `n`-th iteration overall.
    pub fn shutdown_on_iteration(&self, n: u64, coordinator: &ShutdownCoordinator) -> &Self {
        self.inner.lock().shutdown_on_iteration = Some((n, coordinator.clone()));
        self
    }

    /// Reports a `CurrentTime` value for every live item on each iteration.
    pub fn emit_values(&self, enabled: bool) -> &Self {
        self.inner.lock().emit_values = enabled;
        self
    }

    /// Returns every recorded call in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().calls.clone()
    }

    /// Counts recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Returns the number of connect attempts.
    pub fn connect_calls(&self) -> usize {
        self.count(TransportCall::is_connect)
    }

    /// Returns the number of subscription requests.
    pub fn subscription_calls(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::CreateSubscription))
    }

    /// Returns the number of monitored item requests.
    pub fn monitored_item_calls(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::CreateMonitoredItem { .. }))
    }

    /// Returns the ids passed to `delete_subscription`.
    pub fn deleted_subscriptions(&self) -> Vec<u32> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::DeleteSubscription(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of `run_iterate` calls.
    pub fn iterations(&self) -> u64 {
        self.inner.lock().iterations
    }
}

// =============================================================================
// ScriptedTransport
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct LiveItem {
    subscription_id: SubscriptionId,
    monitored_item_id: MonitoredItemId,
    client_handle: u32,
}

/// Scripted, recording [`UaTransport`].
///
/// `run_iterate` waits the full timeout, so tests using it should run on a
/// paused clock.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: ScriptHandle,
    state: ConnectionState,
    pending: Vec<ClientEvent>,
    items: Vec<LiveItem>,
    iterations_since_connect: u32,
}

impl ScriptedTransport {
    /// Creates a transport that succeeds at everything.
    pub fn new() -> Self {
        Self {
            script: ScriptHandle::default(),
            state: ConnectionState::DISCONNECTED,
            pending: Vec::new(),
            items: Vec::new(),
            iterations_since_connect: 0,
        }
    }

    /// Returns a handle sharing this transport's script.
    pub fn handle(&self) -> ScriptHandle {
        self.script.clone()
    }

    fn record(&self, call: TransportCall) {
        self.script.inner.lock().calls.push(call);
    }

    fn transition(&mut self, state: ConnectionState, status: StatusCode) {
        self.state = state;
        self.pending.push(ClientEvent::StateChanged { state, status });
    }

    fn require_session(&self) -> OpcUaResult<()> {
        if self.state.is_operational() {
            Ok(())
        } else {
            Err(OpcUaError::not_connected())
        }
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UaTransport for ScriptedTransport {
    async fn connect(&mut self, endpoint: &str) -> OpcUaResult<()> {
        self.record(TransportCall::Connect(endpoint.to_string()));

        let fail = {
            let mut script = self.script.inner.lock();
            if script.connect_failures > 0 {
                script.connect_failures -= 1;
                true
            } else {
                false
            }
        };

        if fail {
            self.transition(
                ConnectionState::DISCONNECTED,
                StatusCode::BAD_CONNECTION_REJECTED,
            );
            return Err(OpcUaError::connection(ConnectionError::refused(endpoint)));
        }

        self.items.clear();
        self.iterations_since_connect = 0;
        self.transition(
            ConnectionState::new(ChannelState::WaitingAck, SessionState::Closed),
            StatusCode::GOOD,
        );
        self.transition(
            ConnectionState::new(ChannelState::Open, SessionState::Closed),
            StatusCode::GOOD,
        );
        self.transition(ConnectionState::OPERATIONAL, StatusCode::GOOD);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.record(TransportCall::Disconnect);
        self.items.clear();
        if self.state != ConnectionState::DISCONNECTED {
            self.transition(ConnectionState::DISCONNECTED, StatusCode::GOOD);
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn run_iterate(&mut self, timeout: Duration) -> OpcUaResult<()> {
        self.record(TransportCall::Iterate);
        tokio::time::sleep(timeout).await;

        let (lose, shutdown, emit) = {
            let mut script = self.script.inner.lock();
            script.iterations += 1;
            self.iterations_since_connect += 1;

            let lose = match script.lose_connection_after {
                Some(n) if self.state.is_operational() && self.iterations_since_connect >= n => {
                    script.lose_connection_after = None;
                    true
                }
                _ => false,
            };

            let shutdown = match &script.shutdown_on_iteration {
                Some((n, coordinator)) if *n == script.iterations => Some(coordinator.clone()),
                _ => None,
            };

            (lose, shutdown, script.emit_values)
        };

        if emit && self.state.is_operational() {
            let value = DataValue::new(UaDateTime::now());
            for item in &self.items {
                self.pending.push(ClientEvent::DataChange {
                    subscription_id: item.subscription_id,
                    monitored_item_id: item.monitored_item_id,
                    client_handle: item.client_handle,
                    value: value.clone(),
                });
            }
        }

        if lose {
            self.items.clear();
            self.transition(
                ConnectionState::DISCONNECTED,
                StatusCode::BAD_CONNECTION_CLOSED,
            );
        }

        if let Some(coordinator) = shutdown {
            coordinator.initiate_shutdown();
        }

        Ok(())
    }

    fn drain_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.pending)
    }

    async fn create_subscription(
        &mut self,
        _settings: &SubscriptionSettings,
    ) -> OpcUaResult<SubscriptionId> {
        self.record(TransportCall::CreateSubscription);
        self.require_session()?;

        let mut script = self.script.inner.lock();
        if script.subscription_failures > 0 {
            script.subscription_failures -= 1;
            return Err(OpcUaError::subscription(SubscriptionError::creation_failed(
                StatusCode::BAD_TOO_MANY_SUBSCRIPTIONS,
            )));
        }
        Ok(SubscriptionId::new(script.next_id()))
    }

    async fn create_monitored_item(
        &mut self,
        subscription_id: SubscriptionId,
        request: &MonitoredItemRequest,
    ) -> OpcUaResult<MonitoredItemId> {
        self.record(TransportCall::CreateMonitoredItem {
            subscription_id: subscription_id.value(),
            node: request.node_id.to_opc_string(),
        });
        self.require_session()?;

        let id = {
            let mut script = self.script.inner.lock();
            if script.monitored_item_failures > 0 {
                script.monitored_item_failures -= 1;
                return Err(OpcUaError::subscription(
                    SubscriptionError::monitored_item_failed(
                        request.node_id.to_string(),
                        StatusCode::BAD_NODE_ID_UNKNOWN,
                    ),
                ));
            }
            MonitoredItemId::new(script.next_id())
        };

        self.items.push(LiveItem {
            subscription_id,
            monitored_item_id: id,
            client_handle: request.client_handle,
        });
        Ok(id)
    }

    async fn delete_subscription(&mut self, subscription_id: SubscriptionId) -> OpcUaResult<()> {
        self.record(TransportCall::DeleteSubscription(subscription_id.value()));
        self.require_session()?;

        self.items.retain(|i| i.subscription_id != subscription_id);
        self.pending
            .push(ClientEvent::SubscriptionDeleted { subscription_id });
        Ok(())
    }

    fn display_name(&self) -> String {
        "ScriptedTransport".to_string()
    }
}
