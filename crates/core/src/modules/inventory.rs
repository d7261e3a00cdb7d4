// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads and caches the account's Steam Community inventory (C14), grounded
//! on `Sources/Modules/Inventory.cpp`: paginated JSON fetch of
//! `steamcommunity.com/inventory/<steamid>/<appid>/<contextid>`, rate
//! limited to one reload per 30 s, triggered by a fresh inventory-item
//! notification newer than the last one already folded into the cache.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::client::ClientHandle;
use crate::error::{ClientError, Result};
use crate::login::SteamId;
use crate::module::Module;
use crate::modules::asset_data;
use crate::modules::notifications::{ClientNotification, NotificationKind};
use crate::web::Query;

/// Community inventory item count is large for trading-card farms; the
/// original reads "Community Items" (context 6) off the Steam client app.
const STEAM_APP_ID: u32 = 753;
const COMMUNITY_ITEMS_CONTEXT: u64 = 6;
const RATE_LIMIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct InventoryItem {
    pub app_id: u32,
    pub context_id: u64,
    pub asset_id: u64,
    pub class_id: u64,
    pub instance_id: u64,
    pub amount: u64,
}

/// Published as `Inventory` on the Whiteboard.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub when: SystemTime,
    pub items: Vec<InventoryItem>,
}

fn parse_u64(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn parse_item(json: &serde_json::Value) -> Option<InventoryItem> {
    Some(InventoryItem {
        app_id: parse_u64(&json["appid"])? as u32,
        context_id: parse_u64(&json["contextid"])?,
        asset_id: parse_u64(&json["assetid"])?,
        class_id: parse_u64(&json["classid"]).unwrap_or(0),
        instance_id: parse_u64(&json["instanceid"]).unwrap_or(0),
        amount: parse_u64(&json["amount"]).unwrap_or(1),
    })
}

pub struct InventoryModule {
    last_update_notification: SystemTime,
    reload: AsyncMutex<()>,
    last_fetch: Option<Instant>,
}

impl InventoryModule {
    pub fn new() -> Self {
        Self {
            last_update_notification: SystemTime::UNIX_EPOCH,
            reload: AsyncMutex::new(()),
            last_fetch: None,
        }
    }

    fn make_url(steam_id: u64, start_asset_id: u64) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!(
            "https://steamcommunity.com/inventory/{steam_id}/{STEAM_APP_ID}/{COMMUNITY_ITEMS_CONTEXT}"
        ))
        .map_err(|e| ClientError::Http(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("l", "english");
            query.append_pair("count", "1000");
            if start_asset_id != 0 {
                query.append_pair("start_assetid", &start_asset_id.to_string());
            }
        }
        Ok(url)
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_fetch {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT {
                tokio::time::sleep(RATE_LIMIT - elapsed).await;
            }
        }
        self.last_fetch = Some(Instant::now());
    }

    async fn load(&mut self, client: &ClientHandle) -> Result<()> {
        let _guard = self.reload.lock().await;

        let steam_id = client
            .whiteboard
            .borrow()
            .has::<SteamId>()
            .map(|id| id.0)
            .ok_or_else(|| ClientError::Transport("inventory load requested before login".into()))?;

        let mut items = Vec::new();
        let mut start_asset_id = 0u64;
        loop {
            self.rate_limit().await;

            let url = Self::make_url(steam_id, start_asset_id)?;
            let response = client.http.perform(Query::get(url)).await?;
            let json: serde_json::Value = response.json()?;

            for asset in json["assets"].as_array().into_iter().flatten() {
                if let Some(item) = parse_item(asset) {
                    items.push(item);
                }
            }
            for description in json["descriptions"].as_array().into_iter().flatten() {
                asset_data::store(description);
            }

            let more_items = json["more_items"].as_u64().unwrap_or(0);
            if more_items != 1 {
                break;
            }
            start_asset_id = parse_u64(&json["last_assetid"]).unwrap_or(0);
            if start_asset_id == 0 {
                break;
            }
        }

        tracing::info!(count = items.len(), "inventory loaded");
        client.ui.output_text(&format!("loaded {} inventory items", items.len()));
        client.whiteboard.borrow_mut().set(Inventory {
            when: SystemTime::now(),
            items,
        });
        Ok(())
    }
}

impl Default for InventoryModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for InventoryModule {
    fn name(&self) -> &'static str {
        "inventory"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        let observer = client
            .messageboard
            .borrow_mut()
            .observe::<ClientNotification>();

        self.load(&client).await?;

        loop {
            let notification = observer.wait().await;
            if notification.kind != NotificationKind::InventoryItem {
                continue;
            }
            if notification.timestamp <= self.last_update_notification {
                continue;
            }
            self.last_update_notification = notification.timestamp;
            if let Err(e) = self.load(&client).await {
                tracing::error!(err = %e, "failed to reload inventory");
                client.whiteboard.borrow_mut().clear::<Inventory>();
            }
        }
    }
}
