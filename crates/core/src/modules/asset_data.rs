// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-shared cache of inventory item descriptions (`AssetKey ->
//! description JSON`), grounded on `Sources/AssetData.cpp`: fed by
//! [`super::inventory`]'s `descriptions[]` pages, queried by anything that
//! needs to turn a bare `(appId, classId, instanceId)` into display data.
//! Unlike [`super::package_data`] this cache is never persisted to disk —
//! it is not part of the DataFile's recognized schema (§6.3) and is cheap
//! to rebuild from the next inventory load.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;

/// `(appId, classId, instanceId)` — identifies one asset *type*, not a
/// specific owned instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub app_id: u32,
    pub class_id: u64,
    pub instance_id: u64,
}

static CACHE: OnceLock<Mutex<HashMap<AssetKey, Value>>> = OnceLock::new();

fn cache() -> &'static Mutex<HashMap<AssetKey, Value>> {
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn parse_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Stores one description entry from an inventory page's `descriptions[]`
/// array, keyed by its `(appid, classid, instanceid)`.
pub fn store(description: &Value) {
    let Some(app_id) = parse_u64(&description["appid"]).map(|v| v as u32) else {
        return;
    };
    let Some(class_id) = parse_u64(&description["classid"]) else {
        return;
    };
    let instance_id = parse_u64(&description["instanceid"]).unwrap_or(0);
    let key = AssetKey {
        app_id,
        class_id,
        instance_id,
    };
    cache()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(key, description.clone());
}

pub fn query(key: AssetKey) -> Option<Value> {
    cache()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .get(&key)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_queries_by_composite_key() {
        let description = serde_json::json!({
            "appid": 753,
            "classid": "5295844374",
            "instanceid": "3873503133",
            "market_hash_name": "Trading Card",
        });
        store(&description);
        let key = AssetKey {
            app_id: 753,
            class_id: 5295844374,
            instance_id: 3873503133,
        };
        assert_eq!(query(key).unwrap()["market_hash_name"], "Trading Card");
    }
}
