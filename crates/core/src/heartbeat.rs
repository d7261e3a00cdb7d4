// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic keep-alive after login (C11).

use std::time::Duration;

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::login::{HeartbeatInterval, LastMessageSent, LoginStatus};
use crate::module::Module;
use crate::proto::CMsgClientHeartBeat;
use crate::wire::message::{Header, Message, MessageType};

pub struct HeartbeatModule;

impl HeartbeatModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeartbeatModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for HeartbeatModule {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        loop {
            let interval = {
                let wb = client.whiteboard.borrow();
                match wb.has::<LoginStatus>() {
                    Some(LoginStatus::LoggedIn) => wb
                        .has::<HeartbeatInterval>()
                        .map(|h| h.0)
                        .unwrap_or(Duration::from_secs(30)),
                    _ => Duration::from_secs(1),
                }
            };

            tokio::select! {
                _ = client.cancel.cancelled() => return Err(crate::error::ClientError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }

            let logged_in = matches!(
                client.whiteboard.borrow().has::<LoginStatus>(),
                Some(LoginStatus::LoggedIn)
            );
            if !logged_in {
                continue;
            }

            let last_sent = client
                .whiteboard
                .borrow()
                .has::<LastMessageSent>()
                .map(|t| t.0);
            let idle_for = last_sent.map(|t| t.elapsed()).unwrap_or(interval);
            if idle_for < interval {
                continue;
            }

            send_heartbeat(&client).await?;
        }
    }
}

async fn send_heartbeat(client: &ClientHandle) -> Result<()> {
    use prost::Message as _;
    let body = CMsgClientHeartBeat {
        send_immediate_heartbeat: false,
    }
    .encode_to_vec();
    let msg = Message {
        msg_type: MessageType::ClientHeartBeat,
        header: Header::ProtoBuf(Default::default()),
        body,
    };
    let bytes = crate::wire::encode_message(&msg);
    client.send_packet(bytes).await
}
