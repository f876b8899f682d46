// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! `RUST_LOG` takes precedence over the `--log-level` flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;
use crate::error::{BinError, BinResult};

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// # Arguments
///
/// * `level` - Log level string (trace, debug, info, warn, error)
/// * `format` - Log output format (text, json, compact)
///
/// # Errors
///
/// Returns an initialization error if `level` is not a valid filter or a
/// global subscriber is already installed.
///
/// # Example
///
/// ```ignore
/// use uaclock_bin::logging::init_logging;
/// use uaclock_bin::cli::LogFormat;
///
/// init_logging("info", LogFormat::Text)?;
/// ```
pub fn init_logging(level: &str, format: LogFormat) -> BinResult<()> {
    let env_filter = build_filter(level)?;

    let result = match format {
        LogFormat::Text => init_text_logging(env_filter),
        LogFormat::Json => init_json_logging(env_filter),
        LogFormat::Compact => init_compact_logging(env_filter),
    };

    result.map_err(|e| BinError::init(format!("Failed to initialize logging: {}", e)))
}

/// Builds the filter from `RUST_LOG`, falling back to `level`.
pub fn build_filter(level: &str) -> BinResult<EnvFilter> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| BinError::init(format!("Invalid log level '{}': {}", level, e)))?,
    };

    let opcua = "opcua=warn"
        .parse()
        .map_err(|e| BinError::init(format!("Invalid log directive: {}", e)))?;
    Ok(filter.add_directive(opcua))
}

/// Initializes text-based logging (default).
fn init_text_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(is_terminal),
        )
        .try_init()
}

/// Initializes JSON logging (for log aggregation).
fn init_json_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init()
}

/// Initializes compact logging (minimal output).
fn init_compact_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(is_terminal),
        )
        .try_init()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("warn,uaclock_opcua=debug").is_ok());
    }
}
