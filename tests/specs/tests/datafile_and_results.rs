// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable-storage round-trips (§4.13) and EResult mapping checks (§4.10).

use steamcore::datafile::{is_valid_name, DataFile, Prefix};
use steamcore::error::ResultCode;

#[tokio::test]
async fn update_persists_across_a_fresh_handle() {
    let dir = tempfile::tempdir().expect("tempdir");

    let df = DataFile::open(dir.path(), Prefix::Account, "alice");
    df.update(|v| {
        v["refresh_token"] = serde_json::json!("abc123");
        Ok(())
    })
    .await
    .expect("update");

    // A brand new handle over the same path sees the persisted value.
    let reopened = DataFile::open(dir.path(), Prefix::Account, "alice");
    let token = reopened
        .examine(|v| v["refresh_token"].as_str().map(str::to_string))
        .await
        .expect("examine");
    assert_eq!(token, Some("abc123".to_string()));
}

#[tokio::test]
async fn missing_file_examines_as_empty_object() {
    let dir = tempfile::tempdir().expect("tempdir");
    let df = DataFile::open(dir.path(), Prefix::Steam, "shared");
    let is_empty_object = df
        .examine(|v| v.as_object().is_some_and(|m| m.is_empty()))
        .await
        .expect("examine");
    assert!(is_empty_object);
}

#[tokio::test]
async fn failed_update_leaves_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let df = DataFile::open(dir.path(), Prefix::Account, "bob");
    df.update(|v| {
        v["counter"] = serde_json::json!(1);
        Ok(())
    })
    .await
    .expect("seed");

    let result = df
        .update(|v| {
            v["counter"] = serde_json::json!(999);
            Err::<(), _>(steamcore::error::ClientError::Cancelled)
        })
        .await;
    assert!(result.is_err());

    let counter = df
        .examine(|v| v["counter"].as_i64())
        .await
        .expect("examine");
    assert_eq!(counter, Some(1));
}

#[tokio::test]
async fn account_and_steam_filenames_do_not_collide() {
    let dir = tempfile::tempdir().expect("tempdir");
    let account = DataFile::open(dir.path(), Prefix::Account, "same");
    let steam = DataFile::open(dir.path(), Prefix::Steam, "same");

    account
        .update(|v| {
            v["marker"] = serde_json::json!("account");
            Ok(())
        })
        .await
        .expect("update account");

    // If the two prefixes collided on one filename, `steam` would see the
    // "account" marker `account` just wrote instead of a fresh empty object.
    let steam_marker = steam
        .examine(|v| v["marker"].as_str().map(str::to_string))
        .await
        .expect("examine steam");
    assert_eq!(steam_marker, None);
}

#[test]
fn name_validation_rejects_path_separators() {
    assert!(is_valid_name("alice_123"));
    assert!(!is_valid_name("../etc/passwd"));
    assert!(!is_valid_name(""));
    assert!(!is_valid_name("has space"));
}

#[test]
fn result_code_maps_known_codes_and_falls_back_to_other() {
    assert_eq!(ResultCode::from(1), ResultCode::Ok);
    assert_eq!(ResultCode::from(5), ResultCode::InvalidPassword);
    assert_eq!(ResultCode::from(10), ResultCode::Busy);
    assert_eq!(ResultCode::from(65), ResultCode::InvalidLoginAuthCode);
    assert_eq!(ResultCode::from(85), ResultCode::TwoFactorCodeMismatch);
    assert_eq!(ResultCode::from(424242), ResultCode::Other(424242));
}
