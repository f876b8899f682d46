// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! uaclock - OPC UA server clock watcher
//!
//! Main binary entry point.

use uaclock_bin::error::report_error_and_exit;
use uaclock_bin::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = uaclock_bin::run(cli).await {
        report_error_and_exit(e);
    }
}
