// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reconnecting OPC UA subscription client.
//!
//! The client connects to a server with a fixed retry delay, subscribes to
//! the server's `CurrentTime` variable and logs every value it receives
//! until shutdown is requested. The subscription is deleted before the
//! client disconnects.
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Endpoint and channel failures
//! ├── Session       - Session activation and closure
//! ├── Subscription  - Subscription and monitored item services
//! └── Configuration - Invalid settings
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uaclock_opcua::client::{
//!     ConnectionManager, EventLoop, RealUaTransport, SubscriptionController, UaClient,
//! };
//! use uaclock_opcua::shutdown::ShutdownCoordinator;
//! use uaclock_opcua::types::ClientConfig;
//!
//! let config = ClientConfig::default();
//! let shutdown = ShutdownCoordinator::new();
//! let mut client = UaClient::new(RealUaTransport::new(config.clone()));
//!
//! ConnectionManager::new(&config).connect(&mut client, &shutdown.token()).await?;
//! let mut controller = SubscriptionController::new(&config);
//! controller.setup(&mut client).await?;
//! EventLoop::new(&config).run(&mut client, &shutdown.token()).await;
//! controller.teardown(&mut client).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod shutdown;
pub mod time;
pub mod types;

pub use error::{
    ConfigurationError, ConnectionError, ErrorCode, ErrorSeverity, OpcUaError, OpcUaResult,
    SessionError, SubscriptionError,
};

pub use types::{
    ClientConfig, ClientConfigBuilder, MonitoredItemSettings, NodeId, NodeIdentifier, StatusCode,
    SubscriptionSettings, TimestampsToReturn,
};

pub use time::{DateTimeParts, UaDateTime};

pub use shutdown::{ShutdownCoordinator, ShutdownToken};

pub use client::{
    ClientEvent, ClientObserver, ClientStats, ConnectOutcome, ConnectionManager, ConnectionState,
    CurrentTimeLogger, DataChangeHandler, DataChangeNotification, DataValue, EventLoop, LoopExit,
    MonitoredItemId, SubscriptionController, SubscriptionId, UaClient, UaTransport, Variant,
};

#[cfg(feature = "real-transport")]
pub use client::RealUaTransport;
