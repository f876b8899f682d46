// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection manager with fixed-delay retry.
//!
//! Every failed attempt is followed by the same delay; there is no backoff
//! growth and no jitter. The delay is interrupted by a shutdown request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{ConnectionError, OpcUaError, OpcUaResult};
use crate::shutdown::ShutdownToken;
use crate::types::ClientConfig;

use super::transport::UaTransport;
use super::wrapper::UaClient;

// =============================================================================
// ConnectOutcome
// =============================================================================

/// Result of a connect cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Connected after the given number of attempts.
    Connected {
        /// Attempts made in this cycle, including the successful one.
        attempts: u32,
    },

    /// Shutdown was requested before a connection was established.
    Cancelled,
}

impl ConnectOutcome {
    /// Returns `true` if the client is connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

// =============================================================================
// ConnectionStats
// =============================================================================

/// Statistics for connection attempts.
#[derive(Debug)]
pub struct ConnectionStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    connections: AtomicU64,
}

impl ConnectionStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            connections: AtomicU64::new(0),
        }
    }

    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total number of connection attempts.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of failed attempts.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of successful connections.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Connects a [`UaClient`] to the configured endpoint, retrying on failure.
#[derive(Debug)]
pub struct ConnectionManager {
    endpoint: String,
    retry_delay: Duration,
    max_attempts: Option<u32>,
    stats: ConnectionStats,
}

impl ConnectionManager {
    /// Creates a manager from the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            retry_delay: config.retry_delay,
            max_attempts: config.max_connect_attempts,
            stats: ConnectionStats::new(),
        }
    }

    /// Returns the target endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the connection statistics.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Connects, retrying with a fixed delay until success or shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::RetriesExhausted`] if an attempt limit is
    /// configured and reached. Without a limit this only returns `Ok`.
    pub async fn connect<T: UaTransport>(
        &self,
        client: &mut UaClient<T>,
        shutdown: &ShutdownToken,
    ) -> OpcUaResult<ConnectOutcome> {
        let mut attempts = 0u32;

        loop {
            if shutdown.is_shutdown_requested() {
                return Ok(ConnectOutcome::Cancelled);
            }

            attempts = attempts.saturating_add(1);
            self.stats.record_attempt();

            match client.connect(&self.endpoint).await {
                Ok(()) => {
                    self.stats.record_connection();
                    tracing::info!(
                        endpoint = %self.endpoint,
                        attempts,
                        "Connected to {}",
                        self.endpoint
                    );
                    return Ok(ConnectOutcome::Connected { attempts });
                }
                Err(e) => {
                    self.stats.record_failure();
                    tracing::debug!(attempt = attempts, error = %e, "Connect attempt failed");

                    if let Some(max) = self.max_attempts {
                        if attempts >= max {
                            let error = OpcUaError::connection(ConnectionError::RetriesExhausted {
                                endpoint: self.endpoint.clone(),
                                attempts,
                            });
                            error.log("connect");
                            return Err(error);
                        }
                    }

                    tracing::error!(
                        endpoint = %self.endpoint,
                        error_code = %e.error_code(),
                        "Not connected. Retrying to connect in {}",
                        RetryDelay(self.retry_delay)
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = shutdown.cancelled() => return Ok(ConnectOutcome::Cancelled),
                    }
                }
            }
        }
    }
}

/// Renders a delay as "1 second", "5 seconds" or "250 ms".
struct RetryDelay(Duration);

impl fmt::Display for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if d.subsec_nanos() != 0 || d.is_zero() {
            write!(f, "{} ms", d.as_millis())
        } else if d.as_secs() == 1 {
            write!(f, "1 second")
        } else {
            write!(f, "{} seconds", d.as_secs())
        }
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
    use tokio::time::Instant;

    #[test]
    fn test_retry_delay_display() {
        assert_eq!(RetryDelay(Duration::from_secs(1)).to_string(), "1 second");
        assert_eq!(RetryDelay(Duration::from_secs(3)).to_string(), "3 seconds");
        assert_eq!(RetryDelay(Duration::from_millis(250)).to_string(), "250 ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_fixed_delay() {
        let coordinator = ShutdownCoordinator::new();
        let manager = ConnectionManager::new(&ClientConfig::default());
        let mut client = UaClient::new(FakeTransport::with_connect_failures(3));

        let start = Instant::now();
        let outcome = manager.connect(&mut client, &coordinator.token()).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Connected { attempts: 4 });
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(manager.stats().attempts(), 4);
        assert_eq!(manager.stats().failures(), 3);
        assert_eq!(manager.stats().connections(), 1);
        assert!(client.is_operational());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_limit() {
        let coordinator = ShutdownCoordinator::new();
        let config = ClientConfig::builder().max_connect_attempts(2).build().unwrap();
        let manager = ConnectionManager::new(&config);
        let mut client = UaClient::new(FakeTransport::with_connect_failures(10));

        let err = manager
            .connect(&mut client, &coordinator.token())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpcUaError::Connection(ConnectionError::RetriesExhausted { attempts: 2, .. })
        ));
        assert_eq!(client.transport().connect_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_retry_wait() {
        let coordinator = ShutdownCoordinator::new();
        let config = ClientConfig::builder()
            .retry_delay(Duration::from_secs(60))
            .build()
            .unwrap();
        let manager = ConnectionManager::new(&config);
        let mut client = UaClient::new(FakeTransport::with_connect_failures(u32::MAX));

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.initiate_shutdown();
        });

        let start = Instant::now();
        let outcome = manager.connect(&mut client, &coordinator.token()).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(client.transport().connect_calls, 1);
    }

    #[tokio::test]
    async fn test_no_attempt_after_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        let manager = ConnectionManager::new(&ClientConfig::default());
        let mut client = UaClient::new(FakeTransport::new());

        let outcome = manager.connect(&mut client, &coordinator.token()).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert_eq!(client.transport().connect_calls, 0);
    }
}
