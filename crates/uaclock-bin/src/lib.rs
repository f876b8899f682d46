// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaclock-bin
//!
//! Command-line client that watches an OPC UA server's clock.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────┐
//!                    │   main.rs   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │   cli    │ │  config  │ │ logging  │
//!        └──────────┘ └──────────┘ └──────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   runtime   │
//!                    └──────┬──────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │uaclock-opcua│
//!                    └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Watch the clock of a local server
//! uaclock
//!
//! # Another endpoint, retrying every 5 seconds
//! uaclock -e opc.tcp://plc.local:4840 --retry-delay 5s
//!
//! # Settings from a file
//! uaclock -c /etc/uaclock/uaclock.yaml
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, LogFormat};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::ClientRuntime;

use tracing::error;

use uaclock_opcua::shutdown::ShutdownCoordinator;
use uaclock_opcua::types::ClientConfig;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the client described by `cli` until SIGINT or SIGTERM.
pub async fn run(cli: Cli) -> BinResult<()> {
    init_logging(cli.effective_log_level(), cli.log_format)?;
    let config = config::resolve_config(&cli)?;

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = listener.wait_for_signal().await {
            error!(error = %e, "Failed to install signal handlers");
        }
    });

    run_client(config, shutdown).await
}

#[cfg(feature = "real-transport")]
async fn run_client(config: ClientConfig, shutdown: ShutdownCoordinator) -> BinResult<()> {
    let transport = uaclock_opcua::client::RealUaTransport::new(config.clone());
    ClientRuntime::new(config, transport, shutdown).run().await
}

#[cfg(not(feature = "real-transport"))]
async fn run_client(config: ClientConfig, _shutdown: ShutdownCoordinator) -> BinResult<()> {
    Err(BinError::init(format!(
        "no OPC UA transport for {}; rebuild with `--features real-transport`",
        config.endpoint
    )))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "real-transport")]
    #[tokio::test]
    async fn test_default_build_runs_real_transport() {
        let shutdown = ShutdownCoordinator::new();
        shutdown.initiate_shutdown();

        let result = run_client(ClientConfig::default(), shutdown).await;

        assert!(result.is_ok());
    }

    #[cfg(not(feature = "real-transport"))]
    #[tokio::test]
    async fn test_build_without_transport_reports_feature() {
        let err = run_client(ClientConfig::default(), ShutdownCoordinator::new())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("real-transport"));
    }
}
