// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built configurations and values used across the integration tests.

use std::time::Duration;

use uaclock_opcua::client::{DataValue, Variant};
use uaclock_opcua::time::UaDateTime;
use uaclock_opcua::types::{ClientConfig, NodeId};

// =============================================================================
// Config Fixtures
// =============================================================================

/// Client configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Endpoint used by every fixture.
    pub const ENDPOINT: &'static str = "opc.tcp://plc.test:4840";

    /// Default settings pointed at [`Self::ENDPOINT`].
    pub fn default_config() -> ClientConfig {
        ClientConfig::new(Self::ENDPOINT)
    }

    /// Default settings with an attempt limit.
    pub fn limited_attempts(max: u32) -> ClientConfig {
        let mut config = Self::default_config();
        config.max_connect_attempts = Some(max);
        config
    }

    /// Settings with a custom retry delay.
    pub fn with_retry_delay(delay: Duration) -> ClientConfig {
        let mut config = Self::default_config();
        config.retry_delay = delay;
        config
    }

    /// Settings monitoring a namespaced string node.
    pub fn custom_node() -> ClientConfig {
        let mut config = Self::default_config();
        config.node = NodeId::string(2, "Line1.Clock");
        config
    }
}

// =============================================================================
// Value Fixtures
// =============================================================================

/// Data values and timestamps.
pub struct ValueFixtures;

impl ValueFixtures {
    /// `2024-01-15 12:34:56.789 UTC` in OPC UA ticks.
    pub const KNOWN_TICKS: i64 = 133_497_956_967_890_000;

    /// [`Self::KNOWN_TICKS`] as logged by the current time handler.
    pub const KNOWN_TEXT: &'static str = "15-01-2024 12:34:56.789";

    /// A good `DateTime` value at [`Self::KNOWN_TICKS`].
    pub fn known_time() -> DataValue {
        DataValue::new(UaDateTime::from_ticks(Self::KNOWN_TICKS))
    }

    /// A good value of the wrong type.
    pub fn not_a_time() -> DataValue {
        DataValue::new(Variant::Double(42.0))
    }
}
