// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decodes and caches per-package product data (C14), grounded on
//! `Sources/Modules/PackageData.cpp`: diffs the current `Licenses` against
//! the cache, requests `CMsgClientPICSProductInfo` for what changed, decodes
//! each package's KeyValue buffer (see [`kv`]), and persists the merged
//! cache to the process-shared `Steam-PackageData.json` file.

pub mod kv;

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::ClientHandle;
use crate::datafile::DataFile;
use crate::error::Result;
use crate::jobid::JobId;
use crate::module::Module;
use crate::modules::license_list::Licenses;
use crate::proto::{
    CMsgClientPicsProductInfoRequest, CMsgClientPicsProductInfoRequestPackageInfo,
    CMsgClientPicsProductInfoResponse,
};
use crate::wire::message::{Header, Message, MessageType};

#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub package_id: u32,
    pub change_number: i32,
    pub data: Value,
}

impl PackageInfo {
    fn app_ids(&self) -> Vec<u32> {
        self.data
            .get("appids")
            .and_then(Value::as_object)
            .map(|obj| obj.values().filter_map(Value::as_u64).map(|v| v as u32).collect())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Inner {
    data: HashMap<u32, PackageInfo>,
    app_index: HashMap<u32, Vec<u32>>,
}

impl Inner {
    fn store_new(&mut self, package: PackageInfo) {
        if let Some(old) = self.data.get(&package.package_id) {
            for app_id in old.app_ids() {
                if let Some(list) = self.app_index.get_mut(&app_id) {
                    list.retain(|p| *p != package.package_id);
                }
            }
        }
        for app_id in package.app_ids() {
            let list = self.app_index.entry(app_id).or_default();
            if !list.contains(&package.package_id) {
                list.push(package.package_id);
            }
        }
        self.data.insert(package.package_id, package);
    }

    fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (id, info) in &self.data {
            map.insert(
                id.to_string(),
                serde_json::json!({
                    "packageId": info.package_id,
                    "changeNumber": info.change_number,
                    "data": info.data,
                }),
            );
        }
        Value::Object(map)
    }
}

static CACHE: OnceLock<Mutex<Inner>> = OnceLock::new();
static LOAD_ONCE: OnceCell<()> = OnceCell::const_new();

fn cache() -> &'static Mutex<Inner> {
    CACHE.get_or_init(|| Mutex::new(Inner::default()))
}

async fn ensure_loaded(datafile: &DataFile) -> Result<()> {
    LOAD_ONCE
        .get_or_try_init(|| async move {
            let loaded = datafile.examine(|v| v.as_object().cloned()).await?;
            if let Some(obj) = loaded {
                let mut guard = cache().lock().unwrap_or_else(|p| p.into_inner());
                for (key, value) in obj {
                    let Ok(package_id) = key.parse::<u32>() else {
                        continue;
                    };
                    let change_number = value["changeNumber"].as_i64().unwrap_or(0) as i32;
                    let data = value["data"].clone();
                    guard.store_new(PackageInfo {
                        package_id,
                        change_number,
                        data,
                    });
                }
            }
            Ok::<(), crate::error::ClientError>(())
        })
        .await?;
    Ok(())
}

/// Public lookup used by other modules/embedders: finds the cached package,
/// if any, with a change number at least as high as `license`'s (matching
/// the original's "never returns a staler entry than the license claims"
/// contract).
pub fn lookup(package_id: u32, min_change_number: i32) -> Option<PackageInfo> {
    let guard = cache().lock().unwrap_or_else(|p| p.into_inner());
    guard
        .data
        .get(&package_id)
        .filter(|info| info.change_number >= min_change_number)
        .cloned()
}

pub fn lookup_by_app(app_id: u32) -> Vec<PackageInfo> {
    let guard = cache().lock().unwrap_or_else(|p| p.into_inner());
    guard
        .app_index
        .get(&app_id)
        .into_iter()
        .flatten()
        .filter_map(|id| guard.data.get(id).cloned())
        .collect()
}

fn check_for_updates(licenses: &Licenses) -> Vec<(u32, String)> {
    let guard = cache().lock().unwrap_or_else(|p| p.into_inner());
    licenses
        .licenses
        .values()
        .filter(|license| {
            guard
                .data
                .get(&license.package_id)
                .map(|cached| cached.change_number < license.change_number)
                .unwrap_or(true)
        })
        .map(|license| (license.package_id, license.access_token.clone()))
        .collect()
}

fn ingest(package_id: u32, change_number: i32, buffer: &[u8]) -> bool {
    let mut guard = cache().lock().unwrap_or_else(|p| p.into_inner());
    let already_current = guard
        .data
        .get(&package_id)
        .map(|cached| cached.change_number >= change_number)
        .unwrap_or(false);
    if already_current {
        return false;
    }

    // SteamKit's `CPackageInfo::UpdateFromBuffer` checks a leading u32 flag
    // before reading the KeyValue tree; it is ignored here (reproducing the
    // original's own "ignored with zero ill effects" stance).
    let data = if buffer.len() >= 4 {
        kv::parse(&buffer[4..]).unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    guard.store_new(PackageInfo {
        package_id,
        change_number,
        data,
    });
    true
}

/// Published on the Whiteboard once a batch of requested packages has come
/// back and been merged, pinned to the `Licenses` snapshot that triggered
/// the request. The dispatcher does not thread `jobid_target` through to
/// plain typed-handler subscribers (only the unified-messaging path tracks
/// per-call job ids; see C9), so this fires on every merged response rather
/// than gating on an exact job-id match — a deliberate simplification noted
/// in the design ledger.
#[derive(Debug, Clone)]
pub struct PackageDataUpdated(pub Licenses);

pub struct PackageDataModule {
    latest_job_id: Option<JobId>,
    latest_licenses: Option<Licenses>,
}

impl PackageDataModule {
    pub fn new() -> Self {
        Self {
            latest_job_id: None,
            latest_licenses: None,
        }
    }
}

impl Default for PackageDataModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for PackageDataModule {
    fn name(&self) -> &'static str {
        "package_data"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        ensure_loaded(&client.shared_datafile).await?;

        let licenses_observer = client.whiteboard.borrow_mut().observe::<Licenses>();
        let response_observer = client
            .messageboard
            .borrow_mut()
            .observe::<CMsgClientPicsProductInfoResponse>();

        loop {
            tokio::select! {
                _ = licenses_observer.notified() => {
                    let licenses = {
                        let wb = client.whiteboard.borrow();
                        wb.has::<Licenses>().cloned()
                    };
                    if let Some(licenses) = licenses {
                        self.handle_licenses(&client, &licenses).await?;
                    }
                }
                response = response_observer.wait() => {
                    self.handle_response(&client, &response).await?;
                }
            }
        }
    }
}

impl PackageDataModule {
    async fn handle_licenses(&mut self, client: &ClientHandle, licenses: &Licenses) -> Result<()> {
        let updates = check_for_updates(licenses);
        if updates.is_empty() {
            return Ok(());
        }

        use prost::Message as _;
        let job_id = JobId::new();
        let request = CMsgClientPicsProductInfoRequest {
            packages: updates
                .into_iter()
                .map(|(packageid, access_token)| CMsgClientPicsProductInfoRequestPackageInfo {
                    packageid,
                    access_token,
                })
                .collect(),
        };
        self.latest_job_id = Some(job_id);
        self.latest_licenses = Some(licenses.clone());

        let msg = Message {
            msg_type: MessageType::ClientPicsProductInfoRequest,
            header: Header::ProtoBuf(crate::proto::CMsgProtoBufHeader {
                jobid_source: job_id.as_u64(),
                ..Default::default()
            }),
            body: request.encode_to_vec(),
        };
        let bytes = crate::wire::encode_message(&msg);
        client.send_packet(bytes).await
    }

    async fn handle_response(
        &mut self,
        client: &ClientHandle,
        response: &CMsgClientPicsProductInfoResponse,
    ) -> Result<()> {
        let mut any_changed = false;
        for package in &response.packages {
            if ingest(package.packageid, package.change_number, &package.buffer) {
                any_changed = true;
            }
        }
        if any_changed {
            client
                .shared_datafile
                .update(|v| {
                    *v = cache().lock().unwrap_or_else(|p| p.into_inner()).to_json();
                    Ok(())
                })
                .await?;
            if let Some(licenses) = self.latest_licenses.clone() {
                client
                    .whiteboard
                    .borrow_mut()
                    .set(PackageDataUpdated(licenses));
            }
        }
        Ok(())
    }
}
