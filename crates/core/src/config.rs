// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration surface, grounded on `crates/mux/src/config.rs`'s
//! `clap::Args`-derived struct with `env`-backed defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// CM endpoint host, or empty to use the endpoint provider's discovery.
    #[arg(long, default_value = "", env = "STEAMCORE_CM_HOST")]
    pub cm_host: String,

    #[arg(long, default_value_t = 27017, env = "STEAMCORE_CM_PORT")]
    pub cm_port: u16,

    /// Directory holding per-account `Account-<name>.json` data files.
    #[arg(long, default_value = ".steamcore", env = "STEAMCORE_STATE_DIR")]
    pub state_dir: PathBuf,

    #[arg(long, default_value_t = 15, env = "STEAMCORE_RESTART_BACKOFF_SECS")]
    pub restart_backoff_secs: u64,

    #[arg(long, default_value_t = 10, env = "STEAMCORE_UNIFIED_RETRY_COUNT")]
    pub unified_retry_count: u32,

    #[arg(long, default_value_t = 10, env = "STEAMCORE_UNIFIED_RETRY_SECS")]
    pub unified_retry_secs: u64,

    #[arg(long, default_value_t = 1771, env = "STEAMCORE_PACKAGE_VERSION")]
    pub client_package_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cm_host: String::new(),
            cm_port: 27017,
            state_dir: PathBuf::from(".steamcore"),
            restart_backoff_secs: 15,
            unified_retry_count: 10,
            unified_retry_secs: 10,
            client_package_version: 1771,
        }
    }
}

impl ClientConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }

    pub fn unified_retry_sleep(&self) -> Duration {
        Duration::from_secs(self.unified_retry_secs)
    }
}

/// One configured Steam account (name + credential-resolution strategy).
/// The actual password/guard-code prompting is delegated to the embedder's
/// `Ui` implementation (§6.2); this struct carries only what the login
/// state machine needs to name the data file and kick off the flow.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub account_name: String,
}

impl AccountConfig {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
        }
    }
}
