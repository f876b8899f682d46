// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! The transport owns the protocol stack: secure channel, session and the
//! publish machinery. The client above it only sees connection state
//! transitions, service results and a queue of [`ClientEvent`]s that the
//! transport fills while it processes network traffic.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OpcUaResult;
use crate::time::UaDateTime;
use crate::types::{MonitoredItemSettings, NodeId, StatusCode, SubscriptionSettings};

use super::subscription::{MonitoredItemId, SubscriptionId};

// =============================================================================
// ChannelState
// =============================================================================

/// State of the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No channel.
    #[default]
    Closed,

    /// TCP connection in progress.
    Connecting,

    /// Hello sent, waiting for the acknowledge message.
    WaitingAck,

    /// OpenSecureChannel sent, waiting for the response.
    WaitingResponse,

    /// Secure channel established.
    Open,
}

impl ChannelState {
    /// Returns `true` if the channel is open.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the channel is being established.
    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::WaitingAck | Self::WaitingResponse)
    }

    /// Returns the operator-facing description of this state.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Closed => "The client is disconnected",
            Self::Connecting => "Connecting to the server",
            Self::WaitingAck => "Waiting for ack",
            Self::WaitingResponse => "Waiting for OPN Response",
            Self::Open => "A SecureChannel to the server is open",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Connecting => write!(f, "Connecting"),
            Self::WaitingAck => write!(f, "WaitingAck"),
            Self::WaitingResponse => write!(f, "WaitingResponse"),
            Self::Open => write!(f, "Open"),
        }
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// State of the session on top of the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    #[default]
    Closed,

    /// Session created and activated.
    Activated,
}

impl SessionState {
    /// Returns `true` if the session is activated.
    #[inline]
    pub fn is_activated(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Returns the operator-facing description of this state.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Closed => "Session disconnected",
            Self::Activated => "A session with the server is activated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Activated => write!(f, "Activated"),
        }
    }
}

// =============================================================================
// ConnectionState
// =============================================================================

/// Combined channel and session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ConnectionState {
    /// Secure channel state.
    pub channel: ChannelState,

    /// Session state.
    pub session: SessionState,
}

impl ConnectionState {
    /// Fully disconnected.
    pub const DISCONNECTED: Self = Self::new(ChannelState::Closed, SessionState::Closed);

    /// Channel open and session activated.
    pub const OPERATIONAL: Self = Self::new(ChannelState::Open, SessionState::Activated);

    /// Creates a connection state.
    #[inline]
    pub const fn new(channel: ChannelState, session: SessionState) -> Self {
        Self { channel, session }
    }

    /// Returns `true` if subscription services may be called.
    #[inline]
    pub fn is_operational(&self) -> bool {
        self.channel.is_open() && self.session.is_activated()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel={}, session={}", self.channel, self.session)
    }
}

// =============================================================================
// Variant / DataValue
// =============================================================================

/// Scalar value carried in a notification.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// Empty value.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Double(f64),
    /// String value.
    String(String),
    /// OPC UA timestamp.
    DateTime(UaDateTime),
}

impl Variant {
    /// Returns the timestamp if this is a `DateTime` scalar.
    pub fn as_datetime(&self) -> Option<UaDateTime> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if the value is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the OPC UA type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
        }
    }
}

impl From<UaDateTime> for Variant {
    fn from(value: UaDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v),
        }
    }
}

/// Value with status and timestamps, as delivered by a monitored item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// The value.
    pub value: Variant,

    /// Value status.
    pub status: StatusCode,

    /// Source timestamp.
    pub source_timestamp: Option<UaDateTime>,

    /// Server timestamp.
    pub server_timestamp: Option<UaDateTime>,
}

impl DataValue {
    /// Creates a good value without timestamps.
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets both timestamps.
    pub fn with_timestamps(mut self, source: Option<UaDateTime>, server: Option<UaDateTime>) -> Self {
        self.source_timestamp = source;
        self.server_timestamp = server;
        self
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// ClientEvent
// =============================================================================

/// Event produced by the transport while processing network traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Channel or session state changed.
    StateChanged {
        /// New state.
        state: ConnectionState,
        /// Recovery status reported with the transition.
        status: StatusCode,
    },

    /// A monitored item reported a new value.
    DataChange {
        /// Owning subscription.
        subscription_id: SubscriptionId,
        /// Monitored item.
        monitored_item_id: MonitoredItemId,
        /// Client handle given at creation.
        client_handle: u32,
        /// The new value.
        value: DataValue,
    },

    /// The server confirmed deletion of a subscription.
    SubscriptionDeleted {
        /// Deleted subscription.
        subscription_id: SubscriptionId,
    },

    /// No publish response arrived within the subscription's lifetime.
    SubscriptionInactive {
        /// Inactive subscription.
        subscription_id: SubscriptionId,
    },
}

// =============================================================================
// MonitoredItemRequest
// =============================================================================

/// Parameters for creating one data-change monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemRequest {
    /// Node whose `Value` attribute is monitored.
    pub node_id: NodeId,

    /// Handle echoed back in every notification.
    pub client_handle: u32,

    /// Sampling and queueing parameters.
    pub settings: MonitoredItemSettings,
}

impl MonitoredItemRequest {
    /// Creates a request with default settings.
    pub fn new(node_id: NodeId, client_handle: u32) -> Self {
        Self {
            node_id,
            client_handle,
            settings: MonitoredItemSettings::default(),
        }
    }

    /// Sets the monitored item settings.
    pub fn with_settings(mut self, settings: MonitoredItemSettings) -> Self {
        self.settings = settings;
        self
    }
}

// =============================================================================
// UaTransport Trait
// =============================================================================

/// Abstract transport for the OPC UA client.
///
/// Implementations queue [`ClientEvent`]s as they happen; the client collects
/// them with [`drain_events`](UaTransport::drain_events) after every call and
/// dispatches them synchronously, so callbacks never run concurrently.
#[async_trait]
pub trait UaTransport: Send {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Opens a secure channel and activates a session on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a connection or session error if either step fails.
    async fn connect(&mut self, endpoint: &str) -> OpcUaResult<()>;

    /// Closes the session and the secure channel.
    async fn disconnect(&mut self) -> OpcUaResult<()>;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Processes network traffic for at most `timeout`.
    ///
    /// Returns early once at least one event is queued.
    async fn run_iterate(&mut self, timeout: Duration) -> OpcUaResult<()>;

    /// Takes all queued events in arrival order.
    fn drain_events(&mut self) -> Vec<ClientEvent>;

    // =========================================================================
    // Subscription Services
    // =========================================================================

    /// Creates a subscription.
    async fn create_subscription(
        &mut self,
        settings: &SubscriptionSettings,
    ) -> OpcUaResult<SubscriptionId>;

    /// Creates one data-change monitored item in `subscription_id`.
    ///
    /// A bad per-item status is reported as an error.
    async fn create_monitored_item(
        &mut self,
        subscription_id: SubscriptionId,
        request: &MonitoredItemRequest,
    ) -> OpcUaResult<MonitoredItemId>;

    /// Deletes a subscription and its monitored items.
    async fn delete_subscription(&mut self, subscription_id: SubscriptionId) -> OpcUaResult<()>;

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the transport display name for logging.
    fn display_name(&self) -> String;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state() {
        assert!(ConnectionState::OPERATIONAL.is_operational());
        assert!(!ConnectionState::DISCONNECTED.is_operational());
        assert!(!ConnectionState::new(ChannelState::Open, SessionState::Closed).is_operational());
        assert!(ChannelState::WaitingAck.is_transitioning());
        assert!(!ChannelState::Open.is_transitioning());
        assert_eq!(ConnectionState::default(), ConnectionState::DISCONNECTED);
    }

    #[test]
    fn test_state_descriptions() {
        assert_eq!(ChannelState::Closed.description(), "The client is disconnected");
        assert_eq!(ChannelState::WaitingAck.description(), "Waiting for ack");
        assert_eq!(ChannelState::WaitingResponse.description(), "Waiting for OPN Response");
        assert_eq!(
            SessionState::Activated.description(),
            "A session with the server is activated"
        );
        assert_eq!(SessionState::Closed.description(), "Session disconnected");
    }

    #[test]
    fn test_variant_datetime() {
        let dt = UaDateTime::from_ticks(133_497_956_967_890_000);
        let variant = Variant::from(dt);
        assert_eq!(variant.as_datetime(), Some(dt));
        assert_eq!(variant.type_name(), "DateTime");

        assert_eq!(Variant::Int32(5).as_datetime(), None);
        assert!(Variant::default().is_null());
    }

    #[test]
    fn test_data_value() {
        let value = DataValue::new(Variant::Double(1.5));
        assert!(value.is_good());

        let bad = value.with_status(StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(!bad.is_good());
    }
}
