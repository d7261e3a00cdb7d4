// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fans server-push notifications out to the Messageboard (C14), grounded
//! on `Sources/Modules/ClientNotification.cpp`. The original notes it
//! "couldn't find enums" for the notification-type field; the numeric
//! mapping used here is this crate's own convention, not a documented Steam
//! constant.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use prost::Message as _;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::module::Module;
use crate::proto::CMsgClientNotification;

/// The server-push method name this module listens for (§6.1's
/// unified-messaging push path, C9).
const PUSH_METHOD: &str = "ClientNotifications.NotificationReceived#1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TradeOffer,
    InventoryItem,
    UpdateBadge,
    Other(i32),
}

impl NotificationKind {
    fn from_wire(v: i32) -> Self {
        match v {
            1 => NotificationKind::TradeOffer,
            2 => NotificationKind::InventoryItem,
            3 => NotificationKind::UpdateBadge,
            other => NotificationKind::Other(other),
        }
    }
}

/// Posted on the Messageboard for every decoded push notification.
#[derive(Debug, Clone)]
pub struct ClientNotification {
    pub kind: NotificationKind,
    pub tradeoffer_id: Option<u64>,
    pub sender_account_id: Option<u32>,
    pub timestamp: SystemTime,
}

pub struct NotificationsModule;

impl NotificationsModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NotificationsModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for NotificationsModule {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn init(&mut self, client: &ClientHandle) -> Result<()> {
        let messageboard = client.messageboard.clone();
        client.unified.on_push(PUSH_METHOD, move |msg| {
            let Ok(decoded) = CMsgClientNotification::decode(&msg.body[..]) else {
                tracing::warn!("failed to decode client notification push");
                return;
            };
            let notification = ClientNotification {
                kind: NotificationKind::from_wire(decoded.notification_type),
                tradeoffer_id: (decoded.tradeoffer_id != 0).then_some(decoded.tradeoffer_id),
                sender_account_id: (decoded.sender_account_id != 0)
                    .then_some(decoded.sender_account_id),
                timestamp: SystemTime::now(),
            };
            messageboard.borrow_mut().send(Arc::new(notification));
        });
        Ok(())
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        client.cancel.cancelled().await;
        Err(crate::error::ClientError::Cancelled)
    }
}
