// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks incoming trade offers (C14), grounded on
//! `Sources/Modules/TradeOffers.cpp`: fetches
//! `IEconService/GetTradeOffers` (JSON, not the HTML offers page — the
//! original moved off HTML scraping once the WebAPI endpoint covered the
//! same data) and republishes the active incoming set on the Whiteboard.
//! Reloads are coalesced: a burst of `TradeOffer` notifications inside a
//! 15 s window collapses into a single fetch once the window goes quiet,
//! matching the original's `RateLimiter` debounce around `performWork()`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::{ClientError, Result};
use crate::module::Module;
use crate::modules::notifications::{ClientNotification, NotificationKind};
use crate::web::Query;

const COALESCE_WINDOW: Duration = Duration::from_secs(15);
const ENDPOINT: &str = "https://api.steampowered.com/IEconService/GetTradeOffers/v1/";

#[derive(Debug, Clone)]
pub struct TradeOfferAsset {
    pub app_id: u32,
    pub context_id: u64,
    pub asset_id: u64,
    pub amount: u64,
}

#[derive(Debug, Clone)]
pub struct TradeOffer {
    pub tradeoffer_id: u64,
    pub partner_account_id: u32,
    pub my_items: Vec<TradeOfferAsset>,
    pub their_items: Vec<TradeOfferAsset>,
    pub is_our_offer: bool,
}

/// Published as `IncomingTradeOffers` on the Whiteboard.
#[derive(Debug, Clone, Default)]
pub struct IncomingTradeOffers {
    pub offers: HashMap<u64, TradeOffer>,
}

fn parse_u64(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn parse_assets(array: &serde_json::Value) -> Vec<TradeOfferAsset> {
    array
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|asset| {
            Some(TradeOfferAsset {
                app_id: parse_u64(&asset["appid"])? as u32,
                context_id: parse_u64(&asset["contextid"])?,
                asset_id: parse_u64(&asset["assetid"])?,
                amount: parse_u64(&asset["amount"]).unwrap_or(1),
            })
        })
        .collect()
}

pub struct TradeOffersModule;

impl TradeOffersModule {
    pub fn new() -> Self {
        Self
    }

    fn make_url(access_token: &str) -> Result<reqwest::Url> {
        let mut url =
            reqwest::Url::parse(ENDPOINT).map_err(|e| ClientError::Http(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("access_token", access_token)
            .append_pair("get_received_offers", "1")
            .append_pair("active_only", "1")
            .append_pair("get_descriptions", "0");
        Ok(url)
    }

    async fn load(&self, client: &ClientHandle, access_token: &str) -> Result<()> {
        let url = Self::make_url(access_token)?;
        let response = client.http.perform(Query::get(url)).await?;
        let json: serde_json::Value = response.json()?;

        let mut offers = HashMap::new();
        for entry in json["response"]["trade_offers_received"]
            .as_array()
            .into_iter()
            .flatten()
        {
            let Some(tradeoffer_id) = parse_u64(&entry["tradeofferid"]) else {
                continue;
            };
            let Some(partner_account_id) = parse_u64(&entry["accountid_other"]) else {
                continue;
            };
            offers.insert(
                tradeoffer_id,
                TradeOffer {
                    tradeoffer_id,
                    partner_account_id: partner_account_id as u32,
                    my_items: parse_assets(&entry["items_to_give"]),
                    their_items: parse_assets(&entry["items_to_receive"]),
                    is_our_offer: entry["is_our_offer"].as_bool().unwrap_or(false),
                },
            );
        }

        tracing::info!(count = offers.len(), "incoming trade offers updated");
        client.whiteboard.borrow_mut().set(IncomingTradeOffers { offers });
        Ok(())
    }
}

impl Default for TradeOffersModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for TradeOffersModule {
    fn name(&self) -> &'static str {
        "trade_offers"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        let observer = client
            .messageboard
            .borrow_mut()
            .observe::<ClientNotification>();

        loop {
            let notification = observer.wait().await;
            if notification.kind != NotificationKind::TradeOffer {
                continue;
            }

            // Drain further TradeOffer notifications for up to 15 s of
            // silence before acting, so a burst of pushes triggers one
            // fetch instead of one per notification.
            loop {
                tokio::select! {
                    _ = client.cancel.cancelled() => return Err(ClientError::Cancelled),
                    next = tokio::time::timeout(COALESCE_WINDOW, observer.wait()) => {
                        match next {
                            Ok(n) if n.kind == NotificationKind::TradeOffer => continue,
                            Ok(_) => continue,
                            Err(_elapsed) => break,
                        }
                    }
                }
            }

            let Some(access_token) = client
                .whiteboard
                .borrow()
                .has::<crate::login::LoginRefreshToken>()
                .map(|t| t.0.clone())
            else {
                continue;
            };

            if let Err(e) = self.load(&client, &access_token).await {
                tracing::error!(err = %e, "failed to reload trade offers");
            }
        }
    }
}
