// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client components.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────────┐   ┌─────────────┐
//! │  ConnectionManager   │   │  SubscriptionController  │   │  EventLoop  │
//! │ (fixed-delay retry)  │   │ (one sub, one item)      │   │ (iterate)   │
//! └──────────────────────┘   └──────────────────────────┘   └─────────────┘
//!            │                            │                        │
//!            └────────────────────────────┼────────────────────────┘
//!                                         ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               UaClient                                  │
//! │            (event dispatch, observers, data change handlers)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                         │
//!                                         ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              UaTransport                                │
//! │                   (RealUaTransport with `real-transport`)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod connection;
mod event_loop;
mod handler;
pub mod subscription;
mod transport;
mod wrapper;

#[cfg(test)]
pub(crate) mod fake;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use connection::{ConnectOutcome, ConnectionManager, ConnectionStats};
pub use event_loop::{EventLoop, EventLoopStats, LoopExit};
pub use handler::{ClientObserver, DataChangeHandler, LoggingObserver};
pub use subscription::{
    describe_current_time, CurrentTimeLogger, DataChangeNotification, MonitoredItemId,
    SubscriptionController, SubscriptionId,
};
pub use transport::{
    ChannelState, ClientEvent, ConnectionState, DataValue, MonitoredItemRequest, SessionState,
    UaTransport, Variant,
};
pub use wrapper::{ClientStats, UaClient};

#[cfg(feature = "real-transport")]
pub use real_transport::RealUaTransport;
