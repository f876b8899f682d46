// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription controller.
//!
//! Owns the lifecycle of the single subscription the client keeps on the
//! server: one subscription, one data-change monitored item, deleted again on
//! shutdown.
//!
//! ```text
//!   create_subscription ──ok──▶ create_monitored_item ──ok──▶ active
//!          │                           │
//!          └──err──▶ (no item request) └──err──▶ error returned
//!
//!   teardown: delete_subscription only when an id is held
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OpcUaError, OpcUaResult, SubscriptionError};
use crate::types::{ClientConfig, MonitoredItemSettings, NodeId, SubscriptionSettings};

use super::handler::DataChangeHandler;
use super::transport::{DataValue, UaTransport};
use super::wrapper::UaClient;

// =============================================================================
// IDs
// =============================================================================

/// Server-assigned subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

impl SubscriptionId {
    /// Creates a new subscription ID.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

impl From<u32> for SubscriptionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Server-assigned monitored item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoredItemId(pub u32);

impl MonitoredItemId {
    /// Creates a new monitored item ID.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MonitoredItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mi-{}", self.0)
    }
}

impl From<u32> for MonitoredItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// =============================================================================
// Data Change Notification
// =============================================================================

/// Value change of one monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChangeNotification {
    /// Subscription that produced this notification.
    pub subscription_id: SubscriptionId,

    /// Monitored item.
    pub monitored_item_id: MonitoredItemId,

    /// Client-provided handle.
    pub client_handle: u32,

    /// Node of the monitored item.
    pub node_id: NodeId,

    /// New value.
    pub value: DataValue,
}

// =============================================================================
// Current Time Handler
// =============================================================================

/// Formats a value as `DD-MM-YYYY hh:mm:ss.mmm` if it is a `DateTime` scalar.
///
/// Returns `None` for every other payload.
pub fn describe_current_time(value: &DataValue) -> Option<String> {
    let parts = value.value.as_datetime()?.parts()?;
    Some(parts.to_string())
}

/// Handler that logs every `DateTime` value it receives.
///
/// Values of any other type are ignored.
#[derive(Debug, Clone, Default)]
pub struct CurrentTimeLogger {
    logged: Arc<AtomicU64>,
}

impl CurrentTimeLogger {
    /// Creates a new logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of values logged so far, shared across clones.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl DataChangeHandler for CurrentTimeLogger {
    fn on_data_change(&mut self, notification: &DataChangeNotification) {
        if let Some(date) = describe_current_time(&notification.value) {
            tracing::info!("date is: {}", date);
            self.logged.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// SubscriptionController
// =============================================================================

/// Creates and deletes the client's subscription and monitored item.
///
/// Ids are held as `Option`s: `None` means nothing exists on the server, so
/// teardown never sends a delete for an id that was never assigned.
#[derive(Debug, Clone)]
pub struct SubscriptionController {
    node_id: NodeId,
    subscription_settings: SubscriptionSettings,
    item_settings: MonitoredItemSettings,
    subscription_id: Option<SubscriptionId>,
    monitored_item_id: Option<MonitoredItemId>,
}

impl SubscriptionController {
    /// Creates a controller for the node and settings in `config`.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            node_id: config.node.clone(),
            subscription_settings: config.subscription.clone(),
            item_settings: config.monitored_item.clone(),
            subscription_id: None,
            monitored_item_id: None,
        }
    }

    /// Returns the monitored node.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the current subscription id, if one exists.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription_id
    }

    /// Returns the current monitored item id, if one exists.
    pub fn monitored_item_id(&self) -> Option<MonitoredItemId> {
        self.monitored_item_id
    }

    /// Returns `true` once both the subscription and the item exist.
    pub fn is_active(&self) -> bool {
        self.subscription_id.is_some() && self.monitored_item_id.is_some()
    }

    /// Creates the subscription.
    pub async fn create_subscription<T: UaTransport>(
        &mut self,
        client: &mut UaClient<T>,
    ) -> OpcUaResult<SubscriptionId> {
        match client.create_subscription(&self.subscription_settings).await {
            Ok(id) => {
                tracing::info!(
                    publishing_interval = ?self.subscription_settings.publishing_interval,
                    "Create subscription succeeded, id {}",
                    id.value()
                );
                self.subscription_id = Some(id);
                Ok(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Create subscription not succeeded");
                Err(e)
            }
        }
    }

    /// Creates the monitored item with `handler` in the current subscription.
    ///
    /// Fails without contacting the server when no subscription exists.
    pub async fn create_monitored_item<T, H>(
        &mut self,
        client: &mut UaClient<T>,
        handler: H,
    ) -> OpcUaResult<MonitoredItemId>
    where
        T: UaTransport,
        H: DataChangeHandler + 'static,
    {
        let subscription_id = self
            .subscription_id
            .ok_or_else(|| OpcUaError::subscription(SubscriptionError::NoSubscription))?;

        match client
            .create_data_change_item(
                subscription_id,
                self.node_id.clone(),
                self.item_settings.clone(),
                handler,
            )
            .await
        {
            Ok(id) => {
                tracing::info!(
                    node = %self.node_id,
                    timestamps = %self.item_settings.timestamps,
                    "Monitoring {}, id {}",
                    self.node_id,
                    id.value()
                );
                self.monitored_item_id = Some(id);
                Ok(id)
            }
            Err(e) => {
                tracing::error!(node = %self.node_id, error = %e, "Create monitored item not succeeded");
                Err(e)
            }
        }
    }

    /// Creates the subscription and a monitored item logging the current time.
    ///
    /// A failed subscription skips the monitored item request.
    pub async fn setup<T: UaTransport>(&mut self, client: &mut UaClient<T>) -> OpcUaResult<()> {
        self.setup_with(client, CurrentTimeLogger::new()).await
    }

    /// Like [`setup`](Self::setup) with a custom value-change handler.
    pub async fn setup_with<T, H>(&mut self, client: &mut UaClient<T>, handler: H) -> OpcUaResult<()>
    where
        T: UaTransport,
        H: DataChangeHandler + 'static,
    {
        self.create_subscription(client).await?;
        self.create_monitored_item(client, handler).await?;
        Ok(())
    }

    /// Deletes the subscription if one is held.
    ///
    /// Returns `Ok(true)` if a delete request was sent, `Ok(false)` if there
    /// was nothing to delete. The ids are forgotten in every case.
    pub async fn teardown<T: UaTransport>(&mut self, client: &mut UaClient<T>) -> OpcUaResult<bool> {
        self.monitored_item_id = None;
        let Some(id) = self.subscription_id.take() else {
            tracing::debug!("No subscription to delete");
            return Ok(false);
        };

        client.delete_subscription(id).await?;
        tracing::debug!(subscription = %id, "Delete subscription requested");
        Ok(true)
    }

    /// Forgets the ids after the connection was lost.
    pub fn invalidate(&mut self) {
        if let Some(id) = self.subscription_id.take() {
            tracing::debug!(subscription = %id, "Subscription invalidated by disconnect");
        }
        self.monitored_item_id = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
