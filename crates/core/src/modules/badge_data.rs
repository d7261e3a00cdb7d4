// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polls the account's badge levels (C14), grounded on
//! `Headers/Modules/BadgeData.hpp`/`GetBadgeData.hpp`: the original scrapes
//! the badges HTML page; this crate reaches the same data through the
//! unified-messaging `Player.GetBadges#1` call instead, since that RPC
//! covers the fields this sample module needs without an HTML parser
//! dependency.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::login::{LoginStatus, SteamId};
use crate::module::Module;
use crate::proto::{
    CPlayerGetBadgesRequest as GetBadgesRequest, CPlayerGetBadgesResponse as GetBadgesResponse,
};

const POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Badge {
    pub badge_id: u32,
    pub level: u32,
    pub app_id: u32,
}

/// Published as `BadgeData` on the Whiteboard.
#[derive(Debug, Clone, Default)]
pub struct BadgeData {
    pub badges: HashMap<u32, Badge>,
}

pub struct BadgeDataModule;

impl BadgeDataModule {
    pub fn new() -> Self {
        Self
    }

    async fn load(client: &ClientHandle) -> Result<()> {
        let steam_id = match client.whiteboard.borrow().has::<SteamId>() {
            Some(id) => id.0,
            None => return Ok(()),
        };

        let response: GetBadgesResponse = client
            .unified
            .execute(
                client,
                "Player.GetBadges#1",
                &GetBadgesRequest { steamid: steam_id },
                true,
            )
            .await?;

        let mut badges = HashMap::new();
        for entry in &response.badges {
            badges.insert(
                entry.badgeid,
                Badge {
                    badge_id: entry.badgeid,
                    level: entry.level,
                    app_id: entry.appid,
                },
            );
        }

        tracing::info!("badge data updated");
        client.whiteboard.borrow_mut().set(BadgeData { badges });
        Ok(())
    }
}

impl Default for BadgeDataModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for BadgeDataModule {
    fn name(&self) -> &'static str {
        "badge_data"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        loop {
            let logged_in = matches!(
                client.whiteboard.borrow().has::<LoginStatus>(),
                Some(LoginStatus::LoggedIn)
            );
            if logged_in {
                if let Err(e) = Self::load(&client).await {
                    tracing::error!(err = %e, "failed to load badge data");
                }
            }

            tokio::select! {
                _ = client.cancel.cancelled() => return Err(crate::error::ClientError::Cancelled),
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}
