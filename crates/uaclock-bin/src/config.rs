// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Start from the built-in defaults
//! 2. Replace them with the configuration file, if one is given
//! 3. Apply CLI flags and `UACLOCK_*` environment variables
//! 4. Validate
//!
//! # File Format
//!
//! ```yaml
//! endpoint: opc.tcp://plc.local:4840
//! node: i=2258
//! retry_delay: 1s
//! iterate_timeout: 1s
//! subscription:
//!   publishing_interval: 1s
//! monitored_item:
//!   sampling_interval: 250ms
//!   timestamps: both
//! ```
//!
//! Every key is optional. Durations use the humantime format.

use std::path::Path;

use tracing::{debug, info};

use uaclock_opcua::types::ClientConfig;

use crate::cli::Cli;
use crate::error::{BinError, BinResult};

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from the file extension.
    pub fn from_path(path: &Path) -> BinResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            other => Err(BinError::config(format!(
                "Unsupported configuration format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    fn file_format(self) -> ::config::FileFormat {
        match self {
            Self::Yaml => ::config::FileFormat::Yaml,
            Self::Toml => ::config::FileFormat::Toml,
            Self::Json => ::config::FileFormat::Json,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Loads a client configuration file without validating it.
pub fn load_config_file(path: &Path) -> BinResult<ClientConfig> {
    if !path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let format = ConfigFormat::from_path(path)?;
    info!("Loading configuration from: {}", path.display());

    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).format(format.file_format()))
        .build()?;

    settings
        .try_deserialize()
        .map_err(|e| BinError::config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Loads configuration from a string in the given format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> BinResult<ClientConfig> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from_str(content, format.file_format()))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Builds the effective configuration from the file and flags in `cli`.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, or
/// if the merged configuration is invalid.
pub fn resolve_config(cli: &Cli) -> BinResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => ClientConfig::default(),
    };

    cli.apply_overrides(&mut config);
    config.validate()?;

    debug!(
        endpoint = %config.endpoint,
        node = %config.node,
        retry_delay = ?config.retry_delay,
        publishing_interval = ?config.subscription.publishing_interval,
        "Configuration resolved"
    );
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
