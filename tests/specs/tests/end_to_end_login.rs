// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end checks against an in-process fake CM endpoint: a real
//! `Client::launch` talking over a real `TcpStream` to a hand-rolled server
//! task that speaks the wire framing directly. Exercises the connect →
//! dispatch-loop wiring (§6.2, §4.6) and the header/body session-id
//! propagation through `ClientLogOnResponse` (§4.8, §4.10) that a
//! unit-level test of either half in isolation cannot catch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use steamcore::client;
use steamcore::config::{AccountConfig, ClientConfig};
use steamcore::connection::StaticEndpointProvider;
use steamcore::datafile::{DataFile, Prefix};
use steamcore::error::{ClientError, Result as CoreResult};
use steamcore::login::ClientSessionId;
use steamcore::module;
use steamcore::proto::{CMsgClientLogon, CMsgClientLogonResponse, CMsgProtoBufHeader};
use steamcore::ui::NullUi;
use steamcore::web::{HttpClient, Query, Response};
use steamcore::wire::codec::PacketCodec;
use steamcore::wire::message::{Header, Message, MessageType};
use steamcore::wire::{decode_message, encode_message};

/// Never exercised by the login-via-refresh-token path this test drives;
/// present only so `ClientHandle` has a concrete `HttpClient` to hold.
struct UnusedHttpClient;

#[async_trait::async_trait]
impl HttpClient for UnusedHttpClient {
    async fn perform(&self, _query: Query) -> CoreResult<Response> {
        Err(ClientError::Http("not used by this test".into()))
    }

    fn session_id(&self) -> &str {
        ""
    }
}

async fn start_fake_cm() -> (SocketAddr, tokio::task::JoinHandle<CMsgClientLogon>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake CM");
    let addr = listener.local_addr().expect("local_addr");

    let handle = tokio::spawn(async move {
        let (stream, _peer): (TcpStream, _) = listener.accept().await.expect("accept");
        let mut framed = Framed::new(stream, PacketCodec::default());

        let logon_bytes = framed
            .next()
            .await
            .expect("stream open")
            .expect("decode logon packet");
        let decoded = decode_message(&logon_bytes).expect("decode logon message");
        assert_eq!(decoded.msg_type, MessageType::ClientLogon);
        let logon = CMsgClientLogon::decode(&decoded.body[..]).expect("decode CMsgClientLogon");
        assert_eq!(logon.access_token, "cached-refresh-token");
        // A loopback local endpoint still has a real IPv4 address, so the
        // obfuscated field must differ from the "not known" zero value
        // (§4.10) once the client has actually connected.
        assert_ne!(logon.obfuscated_private_ip, 0);

        let response = CMsgClientLogonResponse {
            eresult: 1, // OK
            legacy_out_of_game_heartbeat_seconds: 30,
            steamid: 76561197960287930,
            cell_id: 7,
            ..Default::default()
        };
        let reply = Message {
            msg_type: MessageType::ClientLogOnResponse,
            header: Header::ProtoBuf(CMsgProtoBufHeader {
                client_sessionid: 4242,
                ..Default::default()
            }),
            body: response.encode_to_vec(),
        };
        let bytes = encode_message(&reply);

        framed
            .send(bytes::Bytes::from(bytes))
            .await
            .expect("send logon response");

        // Keep the connection open for the heartbeat module's lifetime;
        // the test tears the client down via `ClientInfo::quit` before
        // dropping the listener task.
        let _ = framed.next().await;

        logon
    });

    (addr, handle)
}

#[tokio::test]
async fn client_launch_completes_login_against_fake_cm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, server) = start_fake_cm().await;

    let account_datafile = DataFile::open(dir.path(), Prefix::Account, "alice");
    account_datafile
        .update(|v| {
            v["Login"]["Refresh"] = serde_json::json!("cached-refresh-token");
            Ok(())
        })
        .await
        .expect("seed refresh token");

    let account = AccountConfig::new("alice");
    let config = ClientConfig {
        state_dir: dir.path().to_path_buf(),
        ..ClientConfig::default()
    };
    let shared_datafile = Arc::new(DataFile::open(dir.path(), Prefix::Steam, "shared"));
    let endpoint_provider = Arc::new(StaticEndpointProvider { addr: addr.to_string() });
    let ui = Arc::new(NullUi);
    let http = Arc::new(UnusedHttpClient);
    let factories = vec![
        module::factory(|| Box::new(steamcore::login::LoginModule::new())),
        module::factory(|| Box::new(steamcore::heartbeat::HeartbeatModule::new())),
    ];

    let info = client::launch(account, config, shared_datafile, endpoint_provider, ui, http, factories)
        .await
        .expect("launch");

    // Poll the account datafile for the steamid write `handle_logon_response`
    // performs only on a successful logon (§4.10) — this can only happen if
    // the connect+dispatch task actually delivered the response and woke
    // `LoginModule::run`'s `logon_response_observer.wait()`.
    let steamid = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let got = account_datafile
                .examine(|v| v["Info"]["SteamID"].as_u64())
                .await
                .expect("examine");
            if let Some(id) = got {
                return id;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("login did not complete in time");
    assert_eq!(steamid, 76561197960287930);

    // Confirm the session id came from the response header, not a
    // hardcoded placeholder: run a closure on the Client's own scheduler
    // thread and ship the whiteboard value back over a channel.
    let (tx, rx) = tokio::sync::oneshot::channel::<Option<i32>>();
    let tx = std::sync::Mutex::new(Some(tx));
    info.execute(move |handle| {
        let session_id = handle.whiteboard.borrow().has::<ClientSessionId>().map(|s| s.0);
        if let Some(tx) = tx.lock().unwrap_or_else(|p| p.into_inner()).take() {
            let _ = tx.send(session_id);
        }
    })
    .await;
    let session_id = rx.await.expect("execute ran the closure");
    assert_eq!(session_id, Some(4242));

    info.quit();
    server.abort();
}
