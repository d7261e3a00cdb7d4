// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks owned packages (C14), grounded on
//! `Sources/Modules/LicenseList.cpp`: subscribes to `CMsgClientLicenseList`,
//! builds a `packageId -> LicenseInfo` map, publishes it on the Whiteboard.

use std::collections::HashMap;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::module::Module;
use crate::proto::CMsgClientLicenseList;

#[derive(Debug, Clone)]
pub struct LicenseInfo {
    pub package_id: u32,
    pub change_number: i32,
    pub license_type: u32,
    pub payment_method: i32,
    pub access_token: String,
    pub time_created: Option<std::time::SystemTime>,
    pub time_next_process: Option<std::time::SystemTime>,
}

/// Published as `Licenses` on the Whiteboard.
#[derive(Debug, Clone, Default)]
pub struct Licenses {
    pub licenses: HashMap<u32, LicenseInfo>,
}

impl Licenses {
    pub fn get(&self, package_id: u32) -> Option<&LicenseInfo> {
        self.licenses.get(&package_id)
    }
}

/// The `Steam` meta-package id, excluded from the map as not a real license
/// (matches the original's `packageId != PackageID::Steam` guard).
const STEAM_PACKAGE_ID: u32 = 0;

pub struct LicenseListModule;

impl LicenseListModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LicenseListModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for LicenseListModule {
    fn name(&self) -> &'static str {
        "license_list"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        let observer = client
            .messageboard
            .borrow_mut()
            .observe::<CMsgClientLicenseList>();
        loop {
            let message = observer.wait().await;
            let mut licenses = HashMap::new();
            for entry in &message.licenses {
                if entry.package_id == STEAM_PACKAGE_ID {
                    continue;
                }
                licenses.insert(
                    entry.package_id,
                    LicenseInfo {
                        package_id: entry.package_id,
                        change_number: entry.last_change_number,
                        license_type: entry.license_type,
                        payment_method: entry.payment_method,
                        access_token: entry.access_token.clone(),
                        time_created: non_zero_time(entry.time_created),
                        time_next_process: non_zero_time(entry.time_next_process),
                    },
                );
            }
            tracing::info!(count = licenses.len(), "license list updated");
            client
                .ui
                .output_text(&format!("account has {} licenses", licenses.len()));
            client
                .whiteboard
                .borrow_mut()
                .set(Licenses { licenses });
        }
    }
}

fn non_zero_time(secs: u32) -> Option<std::time::SystemTime> {
    if secs == 0 {
        None
    } else {
        Some(UNIX_EPOCH + Duration::from_secs(secs as u64))
    }
}
