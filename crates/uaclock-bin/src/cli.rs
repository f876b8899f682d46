// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing.
//!
//! Every flag is optional. Flags left unset keep the value from the
//! configuration file, or the built-in default when no file is given.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use uaclock_opcua::types::{ClientConfig, NodeId};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uaclock - OPC UA server clock watcher
///
/// Connects to an OPC UA server, subscribes to its current time and logs
/// every value until interrupted. Lost connections are re-established.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uaclock",
    author = "Sylvex <contact@sylvex.io>",
    version = crate::VERSION,
    about = "Reconnecting OPC UA current-time subscription client",
    long_about = None
)]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, env = "UACLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server endpoint URL
    #[arg(short, long, env = "UACLOCK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Node to monitor (e.g. `i=2258` or `ns=2;s=Clock`)
    #[arg(short, long, env = "UACLOCK_NODE")]
    pub node: Option<NodeId>,

    /// Delay between connection attempts (e.g. `1s`, `500ms`)
    #[arg(long, env = "UACLOCK_RETRY_DELAY", value_parser = parse_duration)]
    pub retry_delay: Option<Duration>,

    /// Requested publishing interval of the subscription
    #[arg(long, env = "UACLOCK_PUBLISHING_INTERVAL", value_parser = parse_duration)]
    pub publishing_interval: Option<Duration>,

    /// Give up after this many failed connection attempts (default: never)
    #[arg(long, env = "UACLOCK_MAX_CONNECT_ATTEMPTS")]
    pub max_connect_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "UACLOCK_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "UACLOCK_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Writes every flag that was given into `config`.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(node) = &self.node {
            config.node = node.clone();
        }
        if let Some(delay) = self.retry_delay {
            config.retry_delay = delay;
        }
        if let Some(interval) = self.publishing_interval {
            config.subscription.publishing_interval = interval;
        }
        if let Some(max) = self.max_connect_attempts {
            config.max_connect_attempts = Some(max);
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, humantime_serde::re::humantime::DurationError> {
    humantime_serde::re::humantime::parse_duration(value)
}

// =============================================================================
// Tests
// =============================================================================
