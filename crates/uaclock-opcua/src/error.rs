// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client error types.
//!
//! Errors are grouped by the stage of the client lifecycle that produced
//! them, so callers can decide between retrying, logging and giving up:
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Endpoint and secure channel issues
//! ├── Session       - Session lifecycle errors
//! ├── Subscription  - Subscription and monitored item errors
//! └── Configuration - Invalid settings
//! ```
//!
//! # Examples
//!
//! ```
//! use uaclock_opcua::error::{ConnectionError, OpcUaError};
//!
//! let error = OpcUaError::connection(ConnectionError::refused("opc.tcp://localhost:4840"));
//! assert!(error.is_retryable());
//! assert_eq!(error.category(), "connection");
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::StatusCode;

/// Result type alias for OPC UA client operations.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for OPC UA client operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Session lifecycle errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Subscription and monitoring errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates a session error.
    #[inline]
    pub fn session(error: SessionError) -> Self {
        Self::Session(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a "not connected" error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Session(e) => e.is_retryable(),
            Self::Subscription(e) => e.is_retryable(),
            Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if the error means the connection to the server is gone.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Connection(ConnectionError::NotConnected | ConnectionError::Closed { .. })
                | Self::Session(SessionError::NotActivated | SessionError::ClosedByServer { .. })
        )
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(e) => e.severity(),
            Self::Session(e) => e.severity(),
            Self::Subscription(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Session(_) => "session",
            Self::Subscription(_) => "subscription",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Connection-related errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server refused or could not be reached.
    #[error("Connection refused to '{endpoint}' ({status})")]
    Refused {
        /// Target endpoint.
        endpoint: String,
        /// Status reported by the transport.
        status: StatusCode,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed unexpectedly: {}", reason.as_deref().unwrap_or("no reason given"))]
    Closed {
        /// Reason for closure.
        reason: Option<String>,
    },

    /// Not connected.
    #[error("Not connected to OPC UA server")]
    NotConnected,

    /// The configured attempt limit was reached.
    #[error("Gave up connecting to '{endpoint}' after {attempts} attempts")]
    RetriesExhausted {
        /// Target endpoint.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

impl ConnectionError {
    /// Creates a connection refused error with a generic bad status.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            status: StatusCode::BAD_CONNECTION_REJECTED,
        }
    }

    /// Creates a connection refused error carrying the transport's status.
    pub fn refused_with_status(endpoint: impl Into<String>, status: StatusCode) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection closed error.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Refused { .. } | Self::Closed { .. } | Self::NotConnected => true,
            Self::InvalidEndpoint { .. } | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConnected | Self::Closed { .. } => ErrorSeverity::Warning,
            Self::RetriesExhausted { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Refused { .. } => ErrorCode::new(1, 1),
            Self::InvalidEndpoint { .. } => ErrorCode::new(1, 4),
            Self::Closed { .. } => ErrorCode::new(1, 7),
            Self::NotConnected => ErrorCode::new(1, 8),
            Self::RetriesExhausted { .. } => ErrorCode::new(1, 10),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session closed by the server.
    #[error("Session closed by server: {status}")]
    ClosedByServer {
        /// Status reported with the closure.
        status: StatusCode,
    },

    /// An operation required an activated session.
    #[error("Session not activated")]
    NotActivated,
}

impl SessionError {
    /// Creates a "closed by server" error from the status the server sent.
    pub fn closed_by_server(status: StatusCode) -> Self {
        Self::ClosedByServer { status }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotActivated => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ClosedByServer { .. } => ErrorCode::new(2, 4),
            Self::NotActivated => ErrorCode::new(2, 5),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription and monitored item errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Subscription creation failed.
    #[error("Failed to create subscription: {status}")]
    CreationFailed {
        /// Service result returned by the server.
        status: StatusCode,
    },

    /// Subscription deletion failed.
    #[error("Failed to delete subscription {subscription_id}: {status}")]
    DeletionFailed {
        /// Subscription ID.
        subscription_id: u32,
        /// Service result returned by the server.
        status: StatusCode,
    },

    /// A monitored item was requested before any subscription existed.
    #[error("No subscription to attach a monitored item to")]
    NoSubscription,

    /// Monitored item creation failed.
    #[error("Failed to create monitored item for node '{node_id}': {status}")]
    MonitoredItemFailed {
        /// Node ID.
        node_id: String,
        /// Status returned by the server.
        status: StatusCode,
    },
}

impl SubscriptionError {
    /// Creates a subscription creation failed error.
    pub fn creation_failed(status: StatusCode) -> Self {
        Self::CreationFailed { status }
    }

    /// Creates a subscription deletion failed error.
    pub fn deletion_failed(subscription_id: u32, status: StatusCode) -> Self {
        Self::DeletionFailed {
            subscription_id,
            status,
        }
    }

    /// Creates a monitored item failed error.
    pub fn monitored_item_failed(node_id: impl Into<String>, status: StatusCode) -> Self {
        Self::MonitoredItemFailed {
            node_id: node_id.into(),
            status,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CreationFailed { .. } | Self::MonitoredItemFailed { .. }
        )
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CreationFailed { .. } => ErrorSeverity::Error,
            Self::MonitoredItemFailed { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreationFailed { .. } => ErrorCode::new(6, 1),
            Self::DeletionFailed { .. } => ErrorCode::new(6, 3),
            Self::MonitoredItemFailed { .. } => ErrorCode::new(6, 4),
            Self::NoSubscription => ErrorCode::new(6, 5),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {url} ({reason})")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Invalid node ID format.
    #[error("Invalid node ID format: {node_id} ({reason})")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Invalid duration value.
    #[error("Invalid {field}: {duration:?} ({reason})")]
    InvalidInterval {
        /// Field name.
        field: String,
        /// The invalid duration.
        duration: Duration,
        /// Reason.
        reason: String,
    },

    /// Missing required field.
    #[error("Missing required configuration: {field}")]
    MissingField {
        /// The missing field.
        field: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid interval error.
    pub fn invalid_interval(
        field: impl Into<String>,
        duration: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInterval {
            field: field.into(),
            duration,
            reason: reason.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidEndpoint { .. } => ErrorCode::new(8, 1),
            Self::InvalidNodeId { .. } => ErrorCode::new(8, 2),
            Self::InvalidInterval { .. } => ErrorCode::new(8, 4),
            Self::MissingField { .. } => ErrorCode::new(8, 5),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity of an error, used to pick a log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code, rendered as `UA-XXYY`.
///
/// Categories: 1 connection, 2 session, 6 subscription, 8 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================
