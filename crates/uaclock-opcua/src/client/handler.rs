// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Callback traits invoked by [`UaClient`](super::UaClient).
//!
//! Callbacks run synchronously on the task that drives the client, inside
//! `connect`, `run_iterate` and the subscription services. They must not
//! block.

use crate::types::StatusCode;

use super::subscription::{DataChangeNotification, SubscriptionId};
use super::transport::ConnectionState;

// =============================================================================
// ClientObserver
// =============================================================================

/// Receives client-level lifecycle notifications.
///
/// All methods default to no-ops.
pub trait ClientObserver: Send {
    /// Called on every channel or session state transition.
    fn on_state_change(&mut self, _state: ConnectionState, _status: StatusCode) {}

    /// Called when the server confirms a subscription deletion.
    fn on_subscription_deleted(&mut self, _subscription_id: SubscriptionId) {}

    /// Called when a subscription saw no publish response within its lifetime.
    fn on_subscription_inactive(&mut self, _subscription_id: SubscriptionId) {}
}

/// Observer that writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ClientObserver for LoggingObserver {
    fn on_state_change(&mut self, state: ConnectionState, status: StatusCode) {
        tracing::info!(
            channel = %state.channel,
            session = %state.session,
            status = %status,
            "{}",
            state.channel.description()
        );
        tracing::info!("{}", state.session.description());
    }

    fn on_subscription_deleted(&mut self, subscription_id: SubscriptionId) {
        tracing::info!("Subscription Id {} was deleted", subscription_id.value());
    }

    fn on_subscription_inactive(&mut self, subscription_id: SubscriptionId) {
        tracing::info!("Inactivity for subscription {}", subscription_id.value());
    }
}

// =============================================================================
// DataChangeHandler
// =============================================================================

/// Handles value changes of a single monitored item.
pub trait DataChangeHandler: Send {
    /// Called for every notification of the monitored item.
    fn on_data_change(&mut self, notification: &DataChangeNotification);
}

impl<F> DataChangeHandler for F
where
    F: FnMut(&DataChangeNotification) + Send,
{
    fn on_data_change(&mut self, notification: &DataChangeNotification) {
        self(notification)
    }
}

// =============================================================================
// Tests
// =============================================================================
