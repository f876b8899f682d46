// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Client Harness
//!
//! Bundles a scripted client with the three client components and a
//! shutdown coordinator, configured from one [`ClientConfig`].

use uaclock_opcua::client::{ConnectionManager, EventLoop, SubscriptionController, UaClient};
use uaclock_opcua::shutdown::ShutdownCoordinator;
use uaclock_opcua::types::ClientConfig;

use super::fixtures::ConfigFixtures;
use super::mocks::{ScriptHandle, ScriptedTransport};

/// Client, components and script for one test.
#[derive(Debug)]
pub struct ClientHarness {
    /// Configuration every component was built from.
    pub config: ClientConfig,
    /// Shutdown flag shared with the components.
    pub shutdown: ShutdownCoordinator,
    /// Client over a [`ScriptedTransport`].
    pub client: UaClient<ScriptedTransport>,
    /// Script of the client's transport.
    pub script: ScriptHandle,
    /// Connection manager.
    pub manager: ConnectionManager,
    /// Subscription controller.
    pub controller: SubscriptionController,
    /// Event loop.
    pub event_loop: EventLoop,
}

impl ClientHarness {
    /// Creates a harness with the default fixture configuration.
    pub fn new() -> Self {
        Self::with_config(ConfigFixtures::default_config())
    }

    /// Creates a harness from `config`.
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = ScriptedTransport::new();
        let script = transport.handle();
        Self {
            shutdown: ShutdownCoordinator::new(),
            client: UaClient::new(transport),
            script,
            manager: ConnectionManager::new(&config),
            controller: SubscriptionController::new(&config),
            event_loop: EventLoop::new(&config),
            config,
        }
    }
}

impl Default for ClientHarness {
    fn default() -> Self {
        Self::new()
    }
}
