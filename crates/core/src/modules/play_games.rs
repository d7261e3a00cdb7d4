// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tells Steam which app IDs this account is "playing" (C14), grounded on
//! `Sources/Modules/PlayGames.cpp`: the original resends
//! `CMsgClientGamesPlayed` every 10 minutes, and briefly pauses (5 s, game
//! omitted from the send) when asked to stop a title, rather than sending
//! an immediate empty list — Steam's friends UI otherwise flickers between
//! "in-game" and "online" when a game is quickly restarted.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use prost::Message as _;
use tokio::time::Instant;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::login::LoginStatus;
use crate::module::Module;
use crate::proto::CMsgClientGamesPlayed;
use crate::wire::message::{Header, Message, MessageType};

const UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);
const PAUSE_DURATION: Duration = Duration::from_secs(5);

/// Posted on the Messageboard to start or stop playing a set of app IDs.
#[derive(Debug, Clone)]
pub struct PlayGamesRequest {
    pub app_ids: Vec<u32>,
    pub start: bool,
}

struct GameState {
    paused_until: Option<Instant>,
}

pub struct PlayGamesModule {
    games: HashMap<u32, GameState>,
}

impl PlayGamesModule {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
        }
    }

    fn apply(&mut self, request: &PlayGamesRequest) {
        for &app_id in &request.app_ids {
            if request.start {
                self.games.entry(app_id).or_insert(GameState { paused_until: None });
            } else if let Some(game) = self.games.get_mut(&app_id) {
                game.paused_until = Some(Instant::now() + PAUSE_DURATION);
            }
        }
    }

    fn active_app_ids(&mut self) -> Vec<u32> {
        let now = Instant::now();
        self.games.retain(|_, game| match game.paused_until {
            Some(until) => until > now,
            None => true,
        });
        self.games
            .iter()
            .filter(|(_, game)| game.paused_until.is_none())
            .map(|(app_id, _)| *app_id)
            .collect()
    }

    async fn send(&mut self, client: &ClientHandle) -> Result<()> {
        let mut msg = CMsgClientGamesPlayed {
            client_os_type: crate::login::os_type() as u32,
            ..Default::default()
        };
        for app_id in self.active_app_ids() {
            let mut game = Default::default();
            game.game_id = app_id as u64;
            msg.games_played.push(game);
        }
        let body = msg.encode_to_vec();
        let msg = Message {
            msg_type: MessageType::ClientGamesPlayed,
            header: Header::ProtoBuf(Default::default()),
            body,
        };
        let bytes = crate::wire::encode_message(&msg);
        client.send_packet(bytes).await
    }
}

impl Default for PlayGamesModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for PlayGamesModule {
    fn name(&self) -> &'static str {
        "play_games"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        let observer = client
            .messageboard
            .borrow_mut()
            .observe::<PlayGamesRequest>();

        loop {
            tokio::select! {
                _ = client.cancel.cancelled() => return Err(crate::error::ClientError::Cancelled),
                request = observer.wait() => {
                    self.apply(&request);
                    let logged_in = matches!(
                        client.whiteboard.borrow().has::<LoginStatus>(),
                        Some(LoginStatus::LoggedIn)
                    );
                    if logged_in {
                        self.send(&client).await?;
                    }
                }
                _ = tokio::time::sleep(UPDATE_INTERVAL) => {
                    let logged_in = matches!(
                        client.whiteboard.borrow().has::<LoginStatus>(),
                        Some(LoginStatus::LoggedIn)
                    );
                    if logged_in && !self.games.is_empty() {
                        self.send(&client).await?;
                    }
                }
            }
        }
    }
}
