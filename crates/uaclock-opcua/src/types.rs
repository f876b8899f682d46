// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core OPC UA types and client configuration.
//!
//! - **NodeId**: All four OPC UA node identifier types with parsing
//! - **StatusCode**: Service and value status codes
//! - **ClientConfig**: Client configuration with builder and validation
//! - **SubscriptionSettings** / **MonitoredItemSettings**: Subscription parameters
//!
//! # Examples
//!
//! ```
//! use uaclock_opcua::types::{ClientConfig, NodeId};
//!
//! let config = ClientConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .node(NodeId::SERVER_CURRENT_TIME)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.node.to_string(), "i=2258");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError};

/// Default server endpoint.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840";

/// Default delay between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default timeout handed to each `run_iterate` call.
pub const DEFAULT_ITERATE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default subscription publishing interval.
pub const DEFAULT_PUBLISHING_INTERVAL: Duration = Duration::from_millis(1000);

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// Serialized in the textual `ns=<n>;{i|s|g|b}=<value>` form so it can be
/// written directly in configuration files.
///
/// # Examples
///
/// ```
/// use uaclock_opcua::types::NodeId;
///
/// let parsed: NodeId = "ns=0;i=2258".parse().unwrap();
/// assert_eq!(parsed, NodeId::SERVER_CURRENT_TIME);
///
/// let string = NodeId::string(2, "Boiler.Temperature");
/// assert_eq!(string.to_string(), "ns=2;s=Boiler.Temperature");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// `Server_ServerStatus_CurrentTime` variable (ns=0, i=2258).
    pub const SERVER_CURRENT_TIME: NodeId = NodeId::numeric(0, 2258);

    /// Returns the numeric identifier, if any.
    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            NodeIdentifier::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to the OPC UA string format.
    ///
    /// The namespace prefix is omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::SERVER_CURRENT_TIME
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=2258` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| {
            OpcUaError::configuration(ConfigurationError::invalid_node_id(s, reason))
        };

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("Missing identifier after namespace".into()))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| invalid("Invalid namespace index".into()))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| invalid("Invalid numeric identifier".into()))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| invalid(format!("Invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| invalid(format!("Invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(invalid(
                "Unknown identifier type. Expected i=, s=, g=, or b=".into(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

impl TryFrom<String> for NodeId {
    type Error = OpcUaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(node_id: NodeId) -> Self {
        node_id.to_opc_string()
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
///
/// The top two bits carry the severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: Self = Self(0x0000_0000);
    /// An internal error occurred.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// A low level communication error occurred.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// The operation timed out.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// The operation was cancelled because the application is shutting down.
    pub const BAD_SHUTDOWN: Self = Self(0x800C_0000);
    /// The operation could not complete because the client is not connected.
    pub const BAD_SERVER_NOT_CONNECTED: Self = Self(0x800D_0000);
    /// The session id is not valid.
    pub const BAD_SESSION_ID_INVALID: Self = Self(0x8025_0000);
    /// The session was closed by the client.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// The subscription id is not valid.
    pub const BAD_SUBSCRIPTION_ID_INVALID: Self = Self(0x8028_0000);
    /// The node id refers to a node that does not exist.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// The server has reached its maximum number of subscriptions.
    pub const BAD_TOO_MANY_SUBSCRIPTIONS: Self = Self(0x8077_0000);
    /// The secure channel has been closed.
    pub const BAD_SECURE_CHANNEL_CLOSED: Self = Self(0x8086_0000);
    /// Could not establish a network connection to remote server.
    pub const BAD_CONNECTION_REJECTED: Self = Self(0x80AC_0000);
    /// The server has disconnected from the client.
    pub const BAD_DISCONNECT: Self = Self(0x80AD_0000);
    /// The network connection has been closed.
    pub const BAD_CONNECTION_CLOSED: Self = Self(0x80AE_0000);

    /// Returns the raw value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns `true` for good status codes.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` for uncertain status codes.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` for bad status codes.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::GOOD => "Good",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SHUTDOWN => "BadShutdown",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_SUBSCRIPTION_ID_INVALID => "BadSubscriptionIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_TOO_MANY_SUBSCRIPTIONS => "BadTooManySubscriptions",
            Self::BAD_SECURE_CHANNEL_CLOSED => "BadSecureChannelClosed",
            Self::BAD_CONNECTION_REJECTED => "BadConnectionRejected",
            Self::BAD_DISCONNECT => "BadDisconnect",
            Self::BAD_CONNECTION_CLOSED => "BadConnectionClosed",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Client configuration.
///
/// Every field has a default, so an empty configuration file is valid and
/// describes a client watching the server clock on `opc.tcp://localhost:4840`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server endpoint URL (e.g., "opc.tcp://localhost:4840").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Node to monitor.
    #[serde(default)]
    pub node: NodeId,

    /// Application name presented to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Delay between connection attempts.
    #[serde(default = "default_retry_delay")]
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Maximum connection attempts per connect cycle (`None` = unbounded).
    #[serde(default)]
    pub max_connect_attempts: Option<u32>,

    /// Timeout handed to each `run_iterate` call.
    #[serde(default = "default_iterate_timeout")]
    #[serde(with = "humantime_serde")]
    pub iterate_timeout: Duration,

    /// Session timeout requested from the server.
    #[serde(default = "default_session_timeout")]
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Subscription settings.
    #[serde(default)]
    pub subscription: SubscriptionSettings,

    /// Monitored item settings.
    #[serde(default)]
    pub monitored_item: MonitoredItemSettings,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_application_name() -> String {
    "uaclock".to_string()
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

fn default_iterate_timeout() -> Duration {
    DEFAULT_ITERATE_TIMEOUT
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration with defaults for everything but the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), OpcUaError> {
        if self.endpoint.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                "endpoint",
            )));
        }

        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_endpoint(
                &self.endpoint,
                "Endpoint must start with opc.tcp://",
            )));
        }

        if self.max_connect_attempts == Some(0) {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_interval(
                "max_connect_attempts",
                Duration::ZERO,
                "At least one connection attempt is required",
            )));
        }

        let intervals = [
            ("retry_delay", self.retry_delay),
            ("iterate_timeout", self.iterate_timeout),
            ("session_timeout", self.session_timeout),
            (
                "subscription.publishing_interval",
                self.subscription.publishing_interval,
            ),
        ];
        for (field, duration) in intervals {
            if duration.is_zero() {
                return Err(OpcUaError::configuration(
                    ConfigurationError::invalid_interval(field, duration, "Must be greater than 0"),
                ));
            }
        }

        self.session_timeout_ms()?;
        Ok(())
    }

    /// Returns the session timeout in whole milliseconds as sent to the server.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the timeout does not fit in a `u32`.
    pub fn session_timeout_ms(&self) -> Result<u32, OpcUaError> {
        u32::try_from(self.session_timeout.as_millis()).map_err(|_| {
            OpcUaError::configuration(ConfigurationError::invalid_interval(
                "session_timeout",
                self.session_timeout,
                "Must not exceed u32::MAX milliseconds",
            ))
        })
    }

    /// Returns the application URI derived from the application name.
    pub fn application_uri(&self) -> String {
        format!("urn:{}:client", self.application_name.replace(' ', ""))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            node: NodeId::default(),
            application_name: default_application_name(),
            retry_delay: default_retry_delay(),
            max_connect_attempts: None,
            iterate_timeout: default_iterate_timeout(),
            session_timeout: default_session_timeout(),
            subscription: SubscriptionSettings::default(),
            monitored_item: MonitoredItemSettings::default(),
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    node: Option<NodeId>,
    application_name: Option<String>,
    retry_delay: Option<Duration>,
    max_connect_attempts: Option<u32>,
    iterate_timeout: Option<Duration>,
    session_timeout: Option<Duration>,
    subscription: Option<SubscriptionSettings>,
    monitored_item: Option<MonitoredItemSettings>,
}

impl ClientConfigBuilder {
    /// Sets the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the node to monitor.
    pub fn node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the delay between connection attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Limits the number of connection attempts.
    pub fn max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = Some(attempts);
        self
    }

    /// Sets the `run_iterate` timeout.
    pub fn iterate_timeout(mut self, timeout: Duration) -> Self {
        self.iterate_timeout = Some(timeout);
        self
    }

    /// Sets the session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Sets the subscription settings.
    pub fn subscription(mut self, settings: SubscriptionSettings) -> Self {
        self.subscription = Some(settings);
        self
    }

    /// Sets the publishing interval, keeping the other subscription settings.
    pub fn publishing_interval(mut self, interval: Duration) -> Self {
        let mut settings = self.subscription.take().unwrap_or_default();
        settings.publishing_interval = interval;
        self.subscription = Some(settings);
        self
    }

    /// Sets the monitored item settings.
    pub fn monitored_item(mut self, settings: MonitoredItemSettings) -> Self {
        self.monitored_item = Some(settings);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ClientConfig, OpcUaError> {
        let config = ClientConfig {
            endpoint: self.endpoint.unwrap_or_else(default_endpoint),
            node: self.node.unwrap_or_default(),
            application_name: self.application_name.unwrap_or_else(default_application_name),
            retry_delay: self.retry_delay.unwrap_or_else(default_retry_delay),
            max_connect_attempts: self.max_connect_attempts,
            iterate_timeout: self.iterate_timeout.unwrap_or_else(default_iterate_timeout),
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
            subscription: self.subscription.unwrap_or_default(),
            monitored_item: self.monitored_item.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// SubscriptionSettings
// =============================================================================

/// OPC UA subscription parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Publishing interval.
    #[serde(default = "default_publishing_interval")]
    #[serde(with = "humantime_serde")]
    pub publishing_interval: Duration,

    /// Lifetime count (publishing intervals before the subscription expires).
    #[serde(default = "default_lifetime_count")]
    pub lifetime_count: u32,

    /// Max keep-alive count.
    #[serde(default = "default_keepalive_count")]
    pub keepalive_count: u32,

    /// Maximum notifications per publish (0 = no limit).
    #[serde(default)]
    pub max_notifications_per_publish: u32,

    /// Priority (0-255, higher is more important).
    #[serde(default)]
    pub priority: u8,

    /// Publishing enabled.
    #[serde(default = "default_true")]
    pub publishing_enabled: bool,
}

fn default_publishing_interval() -> Duration {
    DEFAULT_PUBLISHING_INTERVAL
}

fn default_lifetime_count() -> u32 {
    10_000
}

fn default_keepalive_count() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            publishing_interval: default_publishing_interval(),
            lifetime_count: default_lifetime_count(),
            keepalive_count: default_keepalive_count(),
            max_notifications_per_publish: 0,
            priority: 0,
            publishing_enabled: true,
        }
    }
}

// =============================================================================
// MonitoredItemSettings
// =============================================================================

/// Settings for a monitored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItemSettings {
    /// Sampling interval.
    #[serde(default = "default_sampling_interval")]
    #[serde(with = "humantime_serde")]
    pub sampling_interval: Duration,

    /// Server-side queue size.
    #[serde(default = "default_queue_size")]
    pub queue_size: u32,

    /// Discard the oldest value when the queue is full.
    #[serde(default = "default_true")]
    pub discard_oldest: bool,

    /// Timestamps requested with each notification.
    #[serde(default)]
    pub timestamps: TimestampsToReturn,
}

fn default_sampling_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_queue_size() -> u32 {
    1
}

impl Default for MonitoredItemSettings {
    fn default() -> Self {
        Self {
            sampling_interval: default_sampling_interval(),
            queue_size: default_queue_size(),
            discard_oldest: true,
            timestamps: TimestampsToReturn::default(),
        }
    }
}

/// Timestamps the server attaches to notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

impl fmt::Display for TimestampsToReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "Source"),
            Self::Server => write!(f, "Server"),
            Self::Both => write!(f, "Both"),
            Self::Neither => write!(f, "Neither"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parsing() {
        let node: NodeId = "ns=0;i=2258".parse().unwrap();
        assert_eq!(node, NodeId::SERVER_CURRENT_TIME);

        let node: NodeId = "i=2258".parse().unwrap();
        assert_eq!(node.as_numeric(), Some(2258));

        let node: NodeId = "ns=3;s=Line1.Clock".parse().unwrap();
        assert_eq!(node, NodeId::string(3, "Line1.Clock"));

        let node: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(node.identifier, NodeIdentifier::Guid(_)));

        let node: NodeId = "ns=1;b=SGVsbG8=".parse().unwrap();
        assert_eq!(node, NodeId::opaque(1, b"Hello".to_vec()));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=1".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::SERVER_CURRENT_TIME.to_string(), "i=2258");
        assert_eq!(NodeId::numeric(2, 7).to_string(), "ns=2;i=7");
        assert_eq!(NodeId::opaque(1, b"Hello".to_vec()).to_string(), "ns=1;b=SGVsbG8=");
    }

    #[test]
    fn test_node_id_serde_as_string() {
        let json = serde_json::to_string(&NodeId::numeric(2, 1001)).unwrap();
        assert_eq!(json, "\"ns=2;i=1001\"");

        let node: NodeId = serde_json::from_str("\"ns=0;i=2258\"").unwrap();
        assert_eq!(node, NodeId::SERVER_CURRENT_TIME);

        assert!(serde_json::from_str::<NodeId>("\"bogus\"").is_err());
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::BAD_TIMEOUT.is_bad());
        assert!(!StatusCode::BAD_TIMEOUT.is_good());
        assert!(StatusCode(0x4000_0000).is_uncertain());
        assert_eq!(
            StatusCode::BAD_CONNECTION_CLOSED.to_string(),
            "BadConnectionClosed (0x80AE0000)"
        );
        assert_eq!(StatusCode(0x8123_0000).to_string(), "0x81230000");
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.node, NodeId::SERVER_CURRENT_TIME);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.iterate_timeout, Duration::from_millis(1000));
        assert_eq!(
            config.subscription.publishing_interval,
            Duration::from_millis(1000)
        );
        assert_eq!(config.monitored_item.timestamps, TimestampsToReturn::Both);
        assert!(config.max_connect_attempts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ClientConfig::new("");
        assert!(config.validate().is_err());

        let config = ClientConfig::new("http://localhost:4840");
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.retry_delay = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.max_connect_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_timeout_range() {
        let config = ClientConfig::default();
        assert_eq!(config.session_timeout_ms().unwrap(), 60_000);

        let mut config = ClientConfig::default();
        config.session_timeout = Duration::from_millis(u64::from(u32::MAX) + 1);
        assert!(config.session_timeout_ms().is_err());
        assert!(matches!(
            config.validate(),
            Err(OpcUaError::Configuration(ConfigurationError::InvalidInterval { .. }))
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .endpoint("opc.tcp://plc:4840")
            .node(NodeId::numeric(2, 10))
            .retry_delay(Duration::from_millis(500))
            .publishing_interval(Duration::from_millis(250))
            .max_connect_attempts(5)
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "opc.tcp://plc:4840");
        assert_eq!(config.node, NodeId::numeric(2, 10));
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.subscription.publishing_interval, Duration::from_millis(250));
        assert_eq!(config.subscription.keepalive_count, 10);
        assert_eq!(config.max_connect_attempts, Some(5));
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"endpoint": "opc.tcp://server:4840", "retry_delay": "2s",
                "subscription": {"publishing_interval": "500ms"}}"#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "opc.tcp://server:4840");
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.subscription.publishing_interval, Duration::from_millis(500));
        assert_eq!(config.subscription.lifetime_count, 10_000);
        assert_eq!(config.node, NodeId::SERVER_CURRENT_TIME);
    }
}
