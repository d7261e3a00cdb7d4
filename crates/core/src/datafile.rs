// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account durable JSON blob (C13), grounded on
//! `crates/mux/src/credential/persist.rs`'s load/atomic-save pair,
//! generalized into an `update(fn)` closure form per spec §4.13.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{ClientError, Result};

/// `Account` or `Steam` — the two recognized filename prefixes (§4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Account,
    Steam,
}

impl Prefix {
    fn as_str(self) -> &'static str {
        match self {
            Prefix::Account => "Account",
            Prefix::Steam => "Steam",
        }
    }
}

/// Returns `true` iff every character of `name` is `[A-Za-z0-9_]`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A mutex-serialized, atomically-persisted JSON document.
pub struct DataFile {
    path: PathBuf,
    mutex: Mutex<()>,
}

impl DataFile {
    /// Builds a handle for `<prefix>-<name>.json` under `dir`. `name` must
    /// already satisfy [`is_valid_name`]; this is an invariant the caller
    /// (e.g. the login state machine naming a file after an account) is
    /// expected to have checked, since the on-disk name is derived from
    /// user-controlled input upstream of this type.
    pub fn open(dir: impl AsRef<Path>, prefix: Prefix, name: &str) -> Self {
        let filename = format!("{}-{}.json", prefix.as_str(), name);
        Self {
            path: dir.as_ref().join(filename),
            mutex: Mutex::new(()),
        }
    }

    fn read_or_default(&self) -> Result<Value> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Default::default())),
            Err(e) => Err(ClientError::DataFile(e)),
        }
    }

    fn write_atomically(&self, value: &Value) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read-only view under the mutex.
    pub async fn examine<R>(&self, f: impl FnOnce(&Value) -> R) -> Result<R> {
        let _guard = self.mutex.lock().await;
        let value = self.read_or_default()?;
        Ok(f(&value))
    }

    /// Loads, applies `f`, writes back. If `f` fails, the on-disk content
    /// is re-read (discarding any in-memory mutation) and the error is
    /// propagated — the file is never left in a partially-applied state
    /// because the write only happens after `f` succeeds.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Value) -> Result<R>) -> Result<R> {
        let _guard = self.mutex.lock().await;
        let mut value = self.read_or_default()?;
        match f(&mut value) {
            Ok(result) => {
                self.write_atomically(&value)?;
                Ok(result)
            }
            Err(e) => {
                let _ = self.read_or_default()?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_name_rules() {
        assert!(is_valid_name("my_account_1"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("has/slash"));
    }

    #[tokio::test]
    async fn update_persists_and_examine_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let df = DataFile::open(dir.path(), Prefix::Account, "tester");
        df.update(|v| {
            v["Info"]["SteamID"] = serde_json::json!(76561197960265729u64);
            Ok(())
        })
        .await
        .expect("update");
        let steam_id = df
            .examine(|v| v["Info"]["SteamID"].as_u64())
            .await
            .expect("examine");
        assert_eq!(steam_id, Some(76561197960265729));
    }

    #[tokio::test]
    async fn failed_update_leaves_file_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let df = DataFile::open(dir.path(), Prefix::Account, "tester");
        df.update(|v| {
            v["Info"]["SteamID"] = serde_json::json!(1u64);
            Ok(())
        })
        .await
        .expect("first update");
        let result: Result<()> = df
            .update(|v| {
                v["Info"]["SteamID"] = serde_json::json!(2u64);
                Err(ClientError::Cancelled)
            })
            .await;
        assert!(result.is_err());
        let steam_id = df
            .examine(|v| v["Info"]["SteamID"].as_u64())
            .await
            .expect("examine");
        assert_eq!(steam_id, Some(1));
    }
}
