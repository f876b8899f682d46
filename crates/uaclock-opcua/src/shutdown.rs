// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] owns the shutdown flag and the OS signal
//! listener. The client components receive a [`ShutdownToken`], poll it at
//! iteration boundaries and await it while sleeping between retries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Owns the process-wide shutdown flag.
///
/// # Example
///
/// ```
/// use uaclock_opcua::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// let token = coordinator.token();
///
/// assert!(!token.is_shutdown_requested());
/// coordinator.initiate_shutdown();
/// assert!(token.is_shutdown_requested());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a token observing this coordinator.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            sender: self.sender.clone(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Initiates shutdown. Idempotent.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Waits for SIGINT or SIGTERM (Ctrl+C on Windows), then initiates shutdown.
    ///
    /// Returns immediately if shutdown was already initiated.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be registered.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        let mut manual = self.subscribe();
        if self.is_shutdown_initiated() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            tokio::select! {
                _ = sigint.recv() => info!("Received Ctrl-C"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = manual.recv() => return Ok(()),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl-C");
                }
                _ = manual.recv() => return Ok(()),
            }
        }

        self.initiate_shutdown();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ShutdownToken
// =============================================================================

/// Cheap, cloneable view of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Returns true if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        let _ = receiver.recv().await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutdown_initiated());

        coordinator.initiate_shutdown();

        assert!(coordinator.is_shutdown_initiated());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_token_cancelled_resolves() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.initiate_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("token should resolve after shutdown");
        assert!(token.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_token_cancelled_after_the_fact() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();

        let token = coordinator.token();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-cancelled token should resolve immediately");
    }

    #[tokio::test]
    async fn test_wait_for_signal_returns_on_manual_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_signal().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.initiate_shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should finish");
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_double_shutdown() {
        let coordinator = ShutdownCoordinator::new();

        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        assert!(coordinator.is_shutdown_initiated());
    }
}
