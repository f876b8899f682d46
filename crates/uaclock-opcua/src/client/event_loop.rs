// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cooperative event loop.
//!
//! Pumps [`UaClient::run_iterate`] with a fixed timeout until shutdown is
//! requested. Shutdown is checked between iterations only, so it takes
//! effect within one timeout slice.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::shutdown::ShutdownToken;
use crate::types::ClientConfig;

use super::transport::UaTransport;
use super::wrapper::UaClient;

/// Why [`EventLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopExit {
    /// Shutdown was requested.
    Shutdown,

    /// The channel or session went away.
    ConnectionLost,
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "Shutdown"),
            Self::ConnectionLost => write!(f, "ConnectionLost"),
        }
    }
}

/// Iteration counters.
#[derive(Debug, Default)]
pub struct EventLoopStats {
    iterations: AtomicU64,
    errors: AtomicU64,
}

impl EventLoopStats {
    /// Returns the number of `run_iterate` calls.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Returns the number of iterations that returned an error.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Drives the client until shutdown or connection loss.
#[derive(Debug)]
pub struct EventLoop {
    timeout: Duration,
    stats: EventLoopStats,
}

impl EventLoop {
    /// Creates a loop using the configured iterate timeout.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_timeout(config.iterate_timeout)
    }

    /// Creates a loop with an explicit iterate timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            stats: EventLoopStats::default(),
        }
    }

    /// Returns the iterate timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the loop statistics.
    pub fn stats(&self) -> &EventLoopStats {
        &self.stats
    }

    /// Runs until shutdown is requested or the connection is lost.
    pub async fn run<T: UaTransport>(
        &self,
        client: &mut UaClient<T>,
        shutdown: &ShutdownToken,
    ) -> LoopExit {
        while !shutdown.is_shutdown_requested() {
            self.stats.iterations.fetch_add(1, Ordering::Relaxed);

            if let Err(e) = client.run_iterate(self.timeout).await {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                e.log("run_iterate");
                if e.is_connection_lost() {
                    return LoopExit::ConnectionLost;
                }
            }

            if !client.is_operational() {
                tracing::warn!(state = %client.state(), "Connection to server lost");
                return LoopExit::ConnectionLost;
            }
        }

        LoopExit::Shutdown
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeTransport;
    use crate::shutdown::ShutdownCoordinator;

    async fn connected_client() -> UaClient<FakeTransport> {
        let mut client = UaClient::new(FakeTransport::new());
        client.connect("opc.tcp://localhost:4840").await.unwrap();
        client
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_observed_within_one_iteration() {
        let coordinator = ShutdownCoordinator::new();
        let event_loop = EventLoop::new(&ClientConfig::default());
        let mut client = connected_client().await;

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.initiate_shutdown();
        });

        let exit = event_loop.run(&mut client, &coordinator.token()).await;

        assert_eq!(exit, LoopExit::Shutdown);
        assert_eq!(event_loop.stats().iterations(), 3);
        assert_eq!(client.transport().iterate_calls, 3);
    }

    #[tokio::test]
    async fn test_no_iteration_when_already_shut_down() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        let event_loop = EventLoop::with_timeout(Duration::from_millis(10));
        let mut client = connected_client().await;

        let exit = event_loop.run(&mut client, &coordinator.token()).await;

        assert_eq!(exit, LoopExit::Shutdown);
        assert_eq!(event_loop.stats().iterations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_loss_exits_loop() {
        let coordinator = ShutdownCoordinator::new();
        let event_loop = EventLoop::new(&ClientConfig::default());
        let mut client = connected_client().await;
        client.transport_mut().lose_connection_on_iterate = Some(2);

        let exit = event_loop.run(&mut client, &coordinator.token()).await;

        assert_eq!(exit, LoopExit::ConnectionLost);
        assert_eq!(event_loop.stats().iterations(), 2);
    }
}
