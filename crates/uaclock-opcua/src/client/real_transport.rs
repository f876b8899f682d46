// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport backed by the `opcua` crate.
//!
//! The `opcua` session runs its publish loop on its own thread. Its callbacks
//! push session events into an unbounded channel, and
//! [`run_iterate`](UaTransport::run_iterate) waits on that channel for at
//! most the given timeout. Every connect opens a new channel, so callbacks
//! of a previous session can no longer reach the client. Synchronous session
//! services run on the blocking pool so they never stall the async runtime.
//!
//! The `opcua` client has no subscription inactivity callback, so this
//! transport never reports [`ClientEvent::SubscriptionInactive`].
//!
//! # Example
//!
//! ```rust,ignore
//! use uaclock_opcua::client::{RealUaTransport, UaClient};
//! use uaclock_opcua::types::ClientConfig;
//!
//! let config = ClientConfig::default();
//! let mut client = UaClient::new(RealUaTransport::new(config.clone()));
//! client.connect(&config.endpoint).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use crate::error::{ConnectionError, OpcUaError, OpcUaResult, SessionError, SubscriptionError};
use crate::time::UaDateTime;
use crate::types::{
    ClientConfig, NodeId, NodeIdentifier, StatusCode, SubscriptionSettings, TimestampsToReturn,
};

use super::subscription::{MonitoredItemId, SubscriptionId};
use super::transport::{
    ChannelState, ClientEvent, ConnectionState, DataValue, MonitoredItemRequest, SessionState,
    UaTransport, Variant,
};

type SharedSession = Arc<OpcUaRwLock<Session>>;

/// Notification sent from an `opcua` callback thread.
#[derive(Debug)]
enum SessionEvent {
    /// The connection to the server dropped.
    ConnectionLost,
    /// The server closed the session.
    SessionClosed(StatusCode),
    /// A monitored item reported a new value.
    DataChange {
        monitored_item_id: u32,
        client_handle: u32,
        value: DataValue,
    },
}

// =============================================================================
// RealUaTransport
// =============================================================================

/// Production transport using the `opcua` client stack.
///
/// Connects anonymously without message security.
pub struct RealUaTransport {
    config: ClientConfig,
    session: Option<SharedSession>,
    session_command: Option<oneshot::Sender<SessionCommand>>,
    state: ConnectionState,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    /// Owning subscription per monitored item client handle.
    item_subscriptions: HashMap<u32, SubscriptionId>,
    pending: Vec<ClientEvent>,
}

impl RealUaTransport {
    /// Creates a disconnected transport.
    pub fn new(config: ClientConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            session: None,
            session_command: None,
            state: ConnectionState::DISCONNECTED,
            events_tx,
            events_rx,
            item_subscriptions: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn build_client(&self) -> OpcUaResult<Client> {
        ClientBuilder::new()
            .application_name(&self.config.application_name)
            .application_uri(&self.config.application_uri())
            .session_retry_limit(0)
            .session_timeout(self.config.session_timeout_ms()?)
            .trust_server_certs(true)
            .create_sample_keypair(true)
            .client()
            .ok_or_else(|| {
                OpcUaError::connection(ConnectionError::invalid_endpoint(
                    &self.config.endpoint,
                    "Failed to build OPC UA client",
                ))
            })
    }

    fn session(&self) -> OpcUaResult<SharedSession> {
        self.session.clone().ok_or_else(OpcUaError::not_connected)
    }

    fn transition(&mut self, channel: ChannelState, session: SessionState, status: StatusCode) {
        self.state = ConnectionState::new(channel, session);
        self.pending.push(ClientEvent::StateChanged {
            state: self.state,
            status,
        });
    }

    fn accept(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ConnectionLost => {
                self.transition(
                    ChannelState::Closed,
                    SessionState::Closed,
                    StatusCode::BAD_CONNECTION_CLOSED,
                );
            }
            SessionEvent::SessionClosed(status) => {
                OpcUaError::session(SessionError::closed_by_server(status)).log("session");
                let channel = self.state.channel;
                self.transition(channel, SessionState::Closed, status);
            }
            SessionEvent::DataChange {
                monitored_item_id,
                client_handle,
                value,
            } => match self.item_subscriptions.get(&client_handle) {
                Some(&subscription_id) => self.pending.push(ClientEvent::DataChange {
                    subscription_id,
                    monitored_item_id: MonitoredItemId::new(monitored_item_id),
                    client_handle,
                    value,
                }),
                None => trace!(client_handle, "Dropping notification for unknown item"),
            },
        }
    }

    fn stop_session(&mut self) {
        if let Some(command) = self.session_command.take() {
            let _ = command.send(SessionCommand::Stop);
        }
    }

    /// Forgets the previous session and opens the event channel for the next.
    fn begin_session(&mut self) {
        self.stop_session();
        self.session = None;
        self.item_subscriptions.clear();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events_tx = events_tx;
        self.events_rx = events_rx;
    }

    fn install_callbacks(&self, session: &SharedSession) {
        let mut session = session.write();

        let tx = self.events_tx.clone();
        session.set_connection_status_callback(ConnectionStatusCallback::new(move |connected| {
            if !connected {
                let _ = tx.send(SessionEvent::ConnectionLost);
            }
        }));

        let tx = self.events_tx.clone();
        session.set_session_closed_callback(SessionClosedCallback::new(move |status| {
            let _ = tx.send(SessionEvent::SessionClosed(StatusCode(status.bits())));
        }));
    }

    fn to_opcua_node_id(node_id: &NodeId) -> opcua::types::NodeId {
        let ns = node_id.namespace_index;
        match &node_id.identifier {
            NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(ns, *v),
            NodeIdentifier::String(v) => opcua::types::NodeId::new(ns, v.clone()),
            NodeIdentifier::Guid(v) => {
                opcua::types::NodeId::new(ns, opcua::types::Guid::from_bytes(*v.as_bytes()))
            }
            NodeIdentifier::Opaque(v) => {
                opcua::types::NodeId::new(ns, opcua::types::ByteString::from(v.as_slice()))
            }
        }
    }

    fn to_opcua_timestamps(timestamps: TimestampsToReturn) -> opcua::types::TimestampsToReturn {
        match timestamps {
            TimestampsToReturn::Source => opcua::types::TimestampsToReturn::Source,
            TimestampsToReturn::Server => opcua::types::TimestampsToReturn::Server,
            TimestampsToReturn::Both => opcua::types::TimestampsToReturn::Both,
            TimestampsToReturn::Neither => opcua::types::TimestampsToReturn::Neither,
        }
    }

    fn from_opcua_variant(variant: &opcua::types::Variant) -> Variant {
        use opcua::types::Variant as UaVariant;

        match variant {
            UaVariant::Empty => Variant::Null,
            UaVariant::Boolean(v) => Variant::Boolean(*v),
            UaVariant::SByte(v) => Variant::Int32(i32::from(*v)),
            UaVariant::Byte(v) => Variant::UInt32(u32::from(*v)),
            UaVariant::Int16(v) => Variant::Int32(i32::from(*v)),
            UaVariant::UInt16(v) => Variant::UInt32(u32::from(*v)),
            UaVariant::Int32(v) => Variant::Int32(*v),
            UaVariant::UInt32(v) => Variant::UInt32(*v),
            UaVariant::Int64(v) => Variant::Int64(*v),
            UaVariant::Float(v) => Variant::Double(f64::from(*v)),
            UaVariant::Double(v) => Variant::Double(*v),
            UaVariant::String(v) => Variant::String(v.as_ref().to_string()),
            UaVariant::DateTime(v) => Variant::DateTime(UaDateTime::from_ticks(v.ticks())),
            other => Variant::String(format!("{:?}", other)),
        }
    }

    fn from_opcua_data_value(value: &opcua::types::DataValue) -> DataValue {
        DataValue {
            value: value
                .value
                .as_ref()
                .map(Self::from_opcua_variant)
                .unwrap_or_default(),
            status: value
                .status
                .map(|s| StatusCode(s.bits()))
                .unwrap_or(StatusCode::GOOD),
            source_timestamp: value
                .source_timestamp
                .as_ref()
                .map(|t| UaDateTime::from_ticks(t.ticks())),
            server_timestamp: value
                .server_timestamp
                .as_ref()
                .map(|t| UaDateTime::from_ticks(t.ticks())),
        }
    }
}

/// Runs a synchronous `opcua` call on the blocking pool.
async fn blocking<F, R>(operation: &'static str, f: F) -> OpcUaResult<R>
where
    F: FnOnce() -> OpcUaResult<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        OpcUaError::connection(ConnectionError::closed(Some(format!(
            "{} worker failed: {}",
            operation, e
        ))))
    })?
}

#[async_trait]
impl UaTransport for RealUaTransport {
    async fn connect(&mut self, endpoint: &str) -> OpcUaResult<()> {
        self.begin_session();
        self.transition(ChannelState::Connecting, SessionState::Closed, StatusCode::GOOD);

        info!(endpoint = %endpoint, "Connecting to OPC UA server");

        let mut client = self.build_client()?;
        let url = endpoint.to_string();
        let result = blocking("connect", move || {
            client
                .connect_to_endpoint(
                    (
                        url.as_str(),
                        SecurityPolicy::None.to_str(),
                        MessageSecurityMode::None,
                        UserTokenPolicy::anonymous(),
                    ),
                    IdentityToken::Anonymous,
                )
                .map_err(|status| {
                    OpcUaError::connection(ConnectionError::refused_with_status(
                        url.as_str(),
                        StatusCode(status.bits()),
                    ))
                })
        })
        .await;

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                let status = match &e {
                    OpcUaError::Connection(ConnectionError::Refused { status, .. }) => *status,
                    _ => StatusCode::BAD_COMMUNICATION_ERROR,
                };
                self.transition(ChannelState::Closed, SessionState::Closed, status);
                return Err(e);
            }
        };

        self.install_callbacks(&session);
        self.session_command = Some(Session::run_async(session.clone()));
        self.session = Some(session);

        self.transition(ChannelState::Open, SessionState::Closed, StatusCode::GOOD);
        self.transition(ChannelState::Open, SessionState::Activated, StatusCode::GOOD);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.stop_session();

        if let Some(session) = self.session.take() {
            debug!("Disconnecting from OPC UA server");
            blocking("disconnect", move || {
                session.read().disconnect();
                Ok(())
            })
            .await?;
        }

        if self.state != ConnectionState::DISCONNECTED {
            self.transition(ChannelState::Closed, SessionState::Closed, StatusCode::GOOD);
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn run_iterate(&mut self, timeout: Duration) -> OpcUaResult<()> {
        match tokio::time::timeout(timeout, self.events_rx.recv()).await {
            Ok(Some(event)) => self.accept(event),
            // The sender half lives in `self`, so the channel never closes.
            Ok(None) | Err(_) => return Ok(()),
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.accept(event);
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.pending)
    }

    async fn create_subscription(
        &mut self,
        settings: &SubscriptionSettings,
    ) -> OpcUaResult<SubscriptionId> {
        let session = self.session()?;
        let settings = settings.clone();
        let tx = self.events_tx.clone();

        trace!(interval = ?settings.publishing_interval, "Creating subscription");

        let callback = DataChangeCallback::new(move |items| {
            for item in items.iter() {
                let _ = tx.send(SessionEvent::DataChange {
                    monitored_item_id: item.id(),
                    client_handle: item.client_handle(),
                    value: RealUaTransport::from_opcua_data_value(item.last_value()),
                });
            }
        });

        let id = blocking("create_subscription", move || {
            session
                .read()
                .create_subscription(
                    settings.publishing_interval.as_millis() as f64,
                    settings.lifetime_count,
                    settings.keepalive_count,
                    settings.max_notifications_per_publish,
                    settings.priority,
                    settings.publishing_enabled,
                    callback,
                )
                .map_err(|status| {
                    OpcUaError::subscription(SubscriptionError::creation_failed(StatusCode(
                        status.bits(),
                    )))
                })
        })
        .await?;

        Ok(SubscriptionId::new(id))
    }

    async fn create_monitored_item(
        &mut self,
        subscription_id: SubscriptionId,
        request: &MonitoredItemRequest,
    ) -> OpcUaResult<MonitoredItemId> {
        let session = self.session()?;
        let client_handle = request.client_handle;
        let node_label = request.node_id.to_string();
        let timestamps = Self::to_opcua_timestamps(request.settings.timestamps);

        let create_request = MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId {
                node_id: Self::to_opcua_node_id(&request.node_id),
                attribute_id: AttributeId::Value as u32,
                index_range: UAString::null(),
                data_encoding: QualifiedName::null(),
            },
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle,
                sampling_interval: request.settings.sampling_interval.as_millis() as f64,
                filter: ExtensionObject::null(),
                queue_size: request.settings.queue_size,
                discard_oldest: request.settings.discard_oldest,
            },
        };

        let label = node_label.clone();
        let results = blocking("create_monitored_items", move || {
            session
                .read()
                .create_monitored_items(subscription_id.value(), timestamps, &[create_request])
                .map_err(|status| {
                    OpcUaError::subscription(SubscriptionError::monitored_item_failed(
                        label,
                        StatusCode(status.bits()),
                    ))
                })
        })
        .await?;

        let result = results.into_iter().next().ok_or_else(|| {
            OpcUaError::subscription(SubscriptionError::monitored_item_failed(
                node_label.clone(),
                StatusCode::BAD_INTERNAL_ERROR,
            ))
        })?;

        if !result.status_code.is_good() {
            return Err(OpcUaError::subscription(
                SubscriptionError::monitored_item_failed(
                    node_label,
                    StatusCode(result.status_code.bits()),
                ),
            ));
        }

        self.item_subscriptions.insert(client_handle, subscription_id);
        Ok(MonitoredItemId::new(result.monitored_item_id))
    }

    async fn delete_subscription(&mut self, subscription_id: SubscriptionId) -> OpcUaResult<()> {
        let session = self.session()?;

        let status = blocking("delete_subscription", move || {
            session
                .read()
                .delete_subscription(subscription_id.value())
                .map_err(|status| {
                    OpcUaError::subscription(SubscriptionError::deletion_failed(
                        subscription_id.value(),
                        StatusCode(status.bits()),
                    ))
                })
        })
        .await?;

        if !status.is_good() {
            warn!(subscription = %subscription_id, status = %status, "Delete subscription returned bad status");
            return Err(OpcUaError::subscription(SubscriptionError::deletion_failed(
                subscription_id.value(),
                StatusCode(status.bits()),
            )));
        }

        self.item_subscriptions
            .retain(|_, owner| *owner != subscription_id);
        self.pending
            .push(ClientEvent::SubscriptionDeleted { subscription_id });
        Ok(())
    }

    fn display_name(&self) -> String {
        format!("RealUaTransport({})", self.config.endpoint)
    }
}

impl Drop for RealUaTransport {
    fn drop(&mut self) {
        self.stop_session();
    }
}

// =============================================================================
// Tests
// =============================================================================
