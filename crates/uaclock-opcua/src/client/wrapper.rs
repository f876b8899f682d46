// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level OPC UA client.
//!
//! [`UaClient`] wraps a transport and turns its event queue into synchronous
//! callbacks: observer notifications for state and subscription lifecycle,
//! and per-item [`DataChangeHandler`]s for value changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{OpcUaError, OpcUaResult, SessionError};
use crate::types::{MonitoredItemSettings, NodeId, SubscriptionSettings};

use super::handler::{ClientObserver, DataChangeHandler, LoggingObserver};
use super::subscription::{DataChangeNotification, MonitoredItemId, SubscriptionId};
use super::transport::{ClientEvent, ConnectionState, MonitoredItemRequest, UaTransport};

// =============================================================================
// ClientStats
// =============================================================================

/// Statistics for client operations.
#[derive(Debug)]
pub struct ClientStats {
    /// Data change notifications delivered to a handler.
    data_changes: AtomicU64,

    /// Data change notifications with no registered handler.
    unhandled_notifications: AtomicU64,

    /// State transitions observed.
    state_changes: AtomicU64,

    /// Subscriptions created.
    subscriptions_created: AtomicU64,

    /// Monitored items created.
    monitored_items_created: AtomicU64,
}

impl ClientStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self {
            data_changes: AtomicU64::new(0),
            unhandled_notifications: AtomicU64::new(0),
            state_changes: AtomicU64::new(0),
            subscriptions_created: AtomicU64::new(0),
            monitored_items_created: AtomicU64::new(0),
        }
    }

    fn record_data_change(&self) {
        self.data_changes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unhandled(&self) {
        self.unhandled_notifications.fetch_add(1, Ordering::Relaxed);
    }

    fn record_state_change(&self) {
        self.state_changes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_subscription(&self) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    fn record_monitored_item(&self) {
        self.monitored_items_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of delivered data changes.
    pub fn data_changes(&self) -> u64 {
        self.data_changes.load(Ordering::Relaxed)
    }

    /// Returns the number of notifications without a handler.
    pub fn unhandled_notifications(&self) -> u64 {
        self.unhandled_notifications.load(Ordering::Relaxed)
    }

    /// Returns the number of observed state transitions.
    pub fn state_changes(&self) -> u64 {
        self.state_changes.load(Ordering::Relaxed)
    }

    /// Returns the number of subscriptions created.
    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    /// Returns the number of monitored items created.
    pub fn monitored_items_created(&self) -> u64 {
        self.monitored_items_created.load(Ordering::Relaxed)
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// UaClient
// =============================================================================

struct RegisteredItem {
    subscription_id: SubscriptionId,
    monitored_item_id: MonitoredItemId,
    node_id: NodeId,
    handler: Box<dyn DataChangeHandler>,
}

/// OPC UA client handle.
///
/// Subscription services are only accepted while the channel is open and the
/// session is activated. Every registered handler is dropped as soon as the
/// connection leaves that state, since the server-side ids die with it.
pub struct UaClient<T: UaTransport> {
    transport: T,
    observer: Box<dyn ClientObserver>,
    items: HashMap<u32, RegisteredItem>,
    next_client_handle: u32,
    stats: ClientStats,
}

impl<T: UaTransport> UaClient<T> {
    /// Creates a client that logs lifecycle notifications.
    pub fn new(transport: T) -> Self {
        Self::with_observer(transport, LoggingObserver)
    }

    /// Creates a client with a custom observer.
    pub fn with_observer(transport: T, observer: impl ClientObserver + 'static) -> Self {
        Self {
            transport,
            observer: Box::new(observer),
            items: HashMap::new(),
            next_client_handle: 1,
            stats: ClientStats::new(),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Returns `true` if the channel is open and the session activated.
    pub fn is_operational(&self) -> bool {
        self.state().is_operational()
    }

    /// Returns the client statistics.
    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Returns the number of monitored items with a registered handler.
    pub fn monitored_item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the client and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Connects to `endpoint`, dispatching the state transitions it causes.
    pub async fn connect(&mut self, endpoint: &str) -> OpcUaResult<()> {
        let result = self.transport.connect(endpoint).await;
        self.dispatch_events();
        result
    }

    /// Disconnects and drops every registered handler.
    pub async fn disconnect(&mut self) -> OpcUaResult<()> {
        let result = self.transport.disconnect().await;
        self.dispatch_events();
        self.items.clear();
        result
    }

    /// Runs one bounded slice of network processing.
    ///
    /// Callbacks for everything that arrived during the slice are invoked
    /// before this returns.
    pub async fn run_iterate(&mut self, timeout: Duration) -> OpcUaResult<()> {
        let result = self.transport.run_iterate(timeout).await;
        self.dispatch_events();
        result
    }

    // =========================================================================
    // Subscription Services
    // =========================================================================

    /// Creates a subscription.
    pub async fn create_subscription(
        &mut self,
        settings: &SubscriptionSettings,
    ) -> OpcUaResult<SubscriptionId> {
        self.ensure_operational()?;

        let result = self.transport.create_subscription(settings).await;
        self.dispatch_events();

        let id = result?;
        self.stats.record_subscription();
        Ok(id)
    }

    /// Creates a data-change monitored item and registers its handler.
    pub async fn create_data_change_item<H>(
        &mut self,
        subscription_id: SubscriptionId,
        node_id: NodeId,
        settings: MonitoredItemSettings,
        handler: H,
    ) -> OpcUaResult<MonitoredItemId>
    where
        H: DataChangeHandler + 'static,
    {
        self.ensure_operational()?;

        let client_handle = self.next_client_handle;
        self.next_client_handle = self.next_client_handle.wrapping_add(1).max(1);

        let request = MonitoredItemRequest::new(node_id.clone(), client_handle).with_settings(settings);
        let result = self
            .transport
            .create_monitored_item(subscription_id, &request)
            .await;

        let monitored_item_id = match result {
            Ok(id) => id,
            Err(e) => {
                self.dispatch_events();
                return Err(e);
            }
        };

        self.items.insert(
            client_handle,
            RegisteredItem {
                subscription_id,
                monitored_item_id,
                node_id,
                handler: Box::new(handler),
            },
        );
        self.stats.record_monitored_item();
        self.dispatch_events();

        Ok(monitored_item_id)
    }

    /// Deletes a subscription and drops the handlers of its items.
    pub async fn delete_subscription(&mut self, subscription_id: SubscriptionId) -> OpcUaResult<()> {
        self.ensure_operational()?;

        let result = self.transport.delete_subscription(subscription_id).await;
        self.items
            .retain(|_, item| item.subscription_id != subscription_id);
        self.dispatch_events();
        result
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_operational(&self) -> OpcUaResult<()> {
        if self.is_operational() {
            Ok(())
        } else {
            Err(OpcUaError::session(SessionError::NotActivated))
        }
    }

    fn dispatch_events(&mut self) {
        for event in self.transport.drain_events() {
            match event {
                ClientEvent::StateChanged { state, status } => {
                    self.stats.record_state_change();
                    if !state.is_operational() {
                        self.items.clear();
                    }
                    self.observer.on_state_change(state, status);
                }
                ClientEvent::DataChange {
                    subscription_id,
                    monitored_item_id,
                    client_handle,
                    value,
                } => match self.items.get_mut(&client_handle) {
                    Some(item) if item.monitored_item_id == monitored_item_id => {
                        let notification = DataChangeNotification {
                            subscription_id,
                            monitored_item_id,
                            client_handle,
                            node_id: item.node_id.clone(),
                            value,
                        };
                        item.handler.on_data_change(&notification);
                        self.stats.record_data_change();
                    }
                    _ => {
                        self.stats.record_unhandled();
                        tracing::debug!(
                            subscription = %subscription_id,
                            monitored_item = %monitored_item_id,
                            client_handle,
                            "Data change for unknown monitored item"
                        );
                    }
                },
                ClientEvent::SubscriptionDeleted { subscription_id } => {
                    self.items
                        .retain(|_, item| item.subscription_id != subscription_id);
                    self.observer.on_subscription_deleted(subscription_id);
                }
                ClientEvent::SubscriptionInactive { subscription_id } => {
                    self.observer.on_subscription_inactive(subscription_id);
                }
            }
        }
    }
}

impl<T: UaTransport> std::fmt::Debug for UaClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaClient")
            .field("transport", &self.transport.display_name())
            .field("state", &self.state())
            .field("monitored_items", &self.items.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::client::fake::FakeTransport;
    use crate::client::transport::DataValue;
    use crate::time::UaDateTime;
    use crate::types::StatusCode;

    #[derive(Default, Clone)]
    struct RecordingObserver {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ClientObserver for RecordingObserver {
        fn on_state_change(&mut self, state: ConnectionState, _status: StatusCode) {
            self.log.lock().unwrap().push(format!("state {}", state));
        }

        fn on_subscription_deleted(&mut self, subscription_id: SubscriptionId) {
            self.log.lock().unwrap().push(format!("deleted {}", subscription_id));
        }

        fn on_subscription_inactive(&mut self, subscription_id: SubscriptionId) {
            self.log.lock().unwrap().push(format!("inactive {}", subscription_id));
        }
    }

    #[tokio::test]
    async fn test_services_rejected_when_not_operational() {
        let mut client = UaClient::new(FakeTransport::new());

        let err = client
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OpcUaError::Session(SessionError::NotActivated)));

        let err = client.delete_subscription(SubscriptionId::new(1)).await.unwrap_err();
        assert!(matches!(err, OpcUaError::Session(SessionError::NotActivated)));
        assert_eq!(client.transport().subscription_calls, 0);
    }

    #[tokio::test]
    async fn test_connect_dispatches_state_changes() {
        let observer = RecordingObserver::default();
        let log = observer.log.clone();
        let mut client = UaClient::with_observer(FakeTransport::new(), observer);

        client.connect("opc.tcp://localhost:4840").await.unwrap();

        assert!(client.is_operational());
        let log = log.lock().unwrap();
        assert_eq!(log.last().unwrap(), "state channel=Open, session=Activated");
        assert!(log.len() >= 2);
    }

    #[tokio::test]
    async fn test_data_change_routed_to_handler() {
        let mut client = UaClient::new(FakeTransport::new());
        client.connect("opc.tcp://localhost:4840").await.unwrap();

        let sub = client
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let item = client
            .create_data_change_item(
                sub,
                NodeId::SERVER_CURRENT_TIME,
                MonitoredItemSettings::default(),
                move |n: &DataChangeNotification| sink.lock().unwrap().push(n.value.clone()),
            )
            .await
            .unwrap();

        let dt = UaDateTime::from_ticks(133_497_956_967_890_000);
        client
            .transport_mut()
            .push_data_change(sub, item, DataValue::new(dt));
        client.run_iterate(Duration::from_millis(10)).await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].value.as_datetime(), Some(dt));
        assert_eq!(client.stats().data_changes(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_drops_handlers() {
        let observer = RecordingObserver::default();
        let log = observer.log.clone();
        let mut client = UaClient::with_observer(FakeTransport::new(), observer);
        client.connect("opc.tcp://localhost:4840").await.unwrap();

        let sub = client
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();
        client
            .create_data_change_item(
                sub,
                NodeId::SERVER_CURRENT_TIME,
                MonitoredItemSettings::default(),
                |_: &DataChangeNotification| {},
            )
            .await
            .unwrap();
        assert_eq!(client.monitored_item_count(), 1);

        client.delete_subscription(sub).await.unwrap();
        assert_eq!(client.monitored_item_count(), 0);
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .any(|line| line == &format!("deleted {}", sub)));

        client.disconnect().await.unwrap();
        assert!(!client.is_operational());
    }

    #[tokio::test]
    async fn test_inactive_subscription_reported() {
        let observer = RecordingObserver::default();
        let log = observer.log.clone();
        let mut client = UaClient::with_observer(FakeTransport::new(), observer);
        client.connect("opc.tcp://localhost:4840").await.unwrap();

        let sub = client
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();
        client
            .transport_mut()
            .events
            .push(ClientEvent::SubscriptionInactive { subscription_id: sub });
        client.run_iterate(Duration::from_millis(10)).await.unwrap();

        assert_eq!(
            log.lock().unwrap().last().unwrap(),
            &format!("inactive {}", sub)
        );
        assert!(client.is_operational());
    }
}
