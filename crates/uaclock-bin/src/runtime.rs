// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client runtime orchestration.
//!
//! Composes the connection manager, subscription controller and event loop
//! into one reconnecting session cycle:
//!
//! ```text
//! connect (retry) ──► subscribe ──► run ──► shutdown ──► delete subscription ──► disconnect
//!      ▲                  │          │
//!      │   setup failed   │          │ connection lost
//!      └── wait retry ◄───┘          │
//!      └─────────────────────────────┘
//! ```

use tracing::{error, info, warn};

use uaclock_opcua::client::{
    ConnectOutcome, ConnectionManager, EventLoop, LoopExit, SubscriptionController, UaClient,
    UaTransport,
};
use uaclock_opcua::shutdown::{ShutdownCoordinator, ShutdownToken};
use uaclock_opcua::types::ClientConfig;

use crate::error::BinResult;

// =============================================================================
// ClientRuntime
// =============================================================================

/// Runs the client until shutdown is requested.
pub struct ClientRuntime<T: UaTransport> {
    config: ClientConfig,
    shutdown: ShutdownCoordinator,
    client: UaClient<T>,
    manager: ConnectionManager,
    controller: SubscriptionController,
    event_loop: EventLoop,
    sessions: u64,
}

impl<T: UaTransport> ClientRuntime<T> {
    /// Creates a runtime over `transport`, stopping when `shutdown` fires.
    pub fn new(config: ClientConfig, transport: T, shutdown: ShutdownCoordinator) -> Self {
        Self {
            client: UaClient::new(transport),
            manager: ConnectionManager::new(&config),
            controller: SubscriptionController::new(&config),
            event_loop: EventLoop::new(&config),
            config,
            shutdown,
            sessions: 0,
        }
    }

    /// Returns the client.
    pub fn client(&self) -> &UaClient<T> {
        &self.client
    }

    /// Returns the number of sessions that reached the run loop.
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Runs connect, subscribe and iterate cycles until shutdown.
    ///
    /// The subscription is deleted and the client disconnected before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns an error only if a connection attempt limit is configured and
    /// reached.
    pub async fn run(&mut self) -> BinResult<()> {
        let token = self.shutdown.token();
        info!(
            endpoint = %self.config.endpoint,
            node = %self.config.node,
            transport = %self.client.transport().display_name(),
            "Starting uaclock v{}",
            crate::VERSION
        );

        let result = self.run_cycles(&token).await;
        self.release_session().await;

        info!(sessions = self.sessions, "uaclock stopped");
        result
    }

    async fn run_cycles(&mut self, token: &ShutdownToken) -> BinResult<()> {
        loop {
            match self.manager.connect(&mut self.client, token).await? {
                ConnectOutcome::Cancelled => return Ok(()),
                ConnectOutcome::Connected { .. } => {}
            }

            if let Err(e) = self.controller.setup(&mut self.client).await {
                e.log("subscribe");
                self.release_session().await;
                if !self.wait_before_retry(token).await {
                    return Ok(());
                }
                continue;
            }

            self.sessions += 1;
            match self.event_loop.run(&mut self.client, token).await {
                LoopExit::Shutdown => return Ok(()),
                LoopExit::ConnectionLost => {
                    warn!("Connection lost. Reconnecting");
                    self.controller.invalidate();
                    self.disconnect().await;
                }
            }
        }
    }

    /// Deletes the subscription if the session is still usable, then disconnects.
    async fn release_session(&mut self) {
        if self.client.is_operational() {
            if let Err(e) = self.controller.teardown(&mut self.client).await {
                e.log("delete_subscription");
            }
        } else {
            self.controller.invalidate();
        }
        self.disconnect().await;
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            e.log("disconnect");
        }
    }

    /// Sleeps the retry delay. Returns `false` if shutdown interrupted it.
    async fn wait_before_retry(&self, token: &ShutdownToken) -> bool {
        error!(
            retry_delay = ?self.config.retry_delay,
            "Subscription setup failed. Retrying to connect"
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_delay) => true,
            _ = token.cancelled() => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
