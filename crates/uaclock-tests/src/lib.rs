// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaclock Integration Tests
//!
//! Shared mocks and fixtures plus integration tests for the client
//! components.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p uaclock-tests
//! cargo test -p uaclock-tests --test integration_client
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use uaclock_tests::common::{ClientHarness, ScriptedTransport};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     let mut h = ClientHarness::new();
//!     h.script.fail_connects(2);
//!     h.manager.connect(&mut h.client, &h.shutdown.token()).await.unwrap();
//!     assert_eq!(h.script.connect_calls(), 3);
//! }
//! ```

#![warn(missing_docs)]

pub mod common;
