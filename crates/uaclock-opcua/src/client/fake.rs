// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConnectionError, OpcUaError, OpcUaResult, SubscriptionError};
use crate::types::{StatusCode, SubscriptionSettings};

use super::subscription::{MonitoredItemId, SubscriptionId};
use super::transport::{
    ChannelState, ClientEvent, ConnectionState, DataValue, MonitoredItemRequest, SessionState,
    UaTransport,
};

/// Transport whose outcomes are set through public fields.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    pub state: ConnectionState,
    pub events: Vec<ClientEvent>,
    /// Failed attempts to report before connecting succeeds.
    pub connect_failures: u32,
    pub connect_calls: u32,
    pub disconnect_calls: u32,
    pub iterate_calls: u32,
    /// Drop the connection on this `run_iterate` call (1-based).
    pub lose_connection_on_iterate: Option<u32>,
    pub subscription_status: Option<StatusCode>,
    pub monitored_item_status: Option<StatusCode>,
    pub subscription_calls: u32,
    pub monitored_item_calls: u32,
    pub deleted: Vec<SubscriptionId>,
    pub requests: Vec<MonitoredItemRequest>,
    scripted: VecDeque<ClientEvent>,
    next_id: u32,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_failures(failures: u32) -> Self {
        Self {
            connect_failures: failures,
            ..Self::default()
        }
    }

    /// Queues a data change delivered by the next `run_iterate`.
    pub fn push_data_change(
        &mut self,
        subscription_id: SubscriptionId,
        monitored_item_id: MonitoredItemId,
        value: DataValue,
    ) {
        let client_handle = self
            .requests
            .last()
            .map(|r| r.client_handle)
            .unwrap_or_default();
        self.scripted.push_back(ClientEvent::DataChange {
            subscription_id,
            monitored_item_id,
            client_handle,
            value,
        });
    }

    fn transition(&mut self, channel: ChannelState, session: SessionState, status: StatusCode) {
        self.state = ConnectionState::new(channel, session);
        self.events.push(ClientEvent::StateChanged {
            state: self.state,
            status,
        });
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl UaTransport for FakeTransport {
    async fn connect(&mut self, endpoint: &str) -> OpcUaResult<()> {
        self.connect_calls += 1;

        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            self.transition(
                ChannelState::Closed,
                SessionState::Closed,
                StatusCode::BAD_CONNECTION_REJECTED,
            );
            return Err(OpcUaError::connection(ConnectionError::refused(endpoint)));
        }

        self.transition(ChannelState::WaitingAck, SessionState::Closed, StatusCode::GOOD);
        self.transition(ChannelState::Open, SessionState::Closed, StatusCode::GOOD);
        self.transition(ChannelState::Open, SessionState::Activated, StatusCode::GOOD);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.disconnect_calls += 1;
        if self.state != ConnectionState::DISCONNECTED {
            self.transition(ChannelState::Closed, SessionState::Closed, StatusCode::GOOD);
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn run_iterate(&mut self, timeout: Duration) -> OpcUaResult<()> {
        self.iterate_calls += 1;

        if self.lose_connection_on_iterate == Some(self.iterate_calls) {
            self.transition(
                ChannelState::Closed,
                SessionState::Closed,
                StatusCode::BAD_CONNECTION_CLOSED,
            );
            return Ok(());
        }

        if self.scripted.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        self.events.extend(self.scripted.drain(..));
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.events)
    }

    async fn create_subscription(
        &mut self,
        _settings: &SubscriptionSettings,
    ) -> OpcUaResult<SubscriptionId> {
        self.subscription_calls += 1;
        if let Some(status) = self.subscription_status {
            return Err(OpcUaError::subscription(SubscriptionError::creation_failed(
                status,
            )));
        }
        Ok(SubscriptionId::new(self.next_id()))
    }

    async fn create_monitored_item(
        &mut self,
        _subscription_id: SubscriptionId,
        request: &MonitoredItemRequest,
    ) -> OpcUaResult<MonitoredItemId> {
        self.monitored_item_calls += 1;
        self.requests.push(request.clone());
        if let Some(status) = self.monitored_item_status {
            return Err(OpcUaError::subscription(
                SubscriptionError::monitored_item_failed(request.node_id.to_string(), status),
            ));
        }
        Ok(MonitoredItemId::new(self.next_id()))
    }

    async fn delete_subscription(&mut self, subscription_id: SubscriptionId) -> OpcUaResult<()> {
        self.deleted.push(subscription_id);
        self.events
            .push(ClientEvent::SubscriptionDeleted { subscription_id });
        Ok(())
    }

    fn display_name(&self) -> String {
        "fake".to_string()
    }
}
