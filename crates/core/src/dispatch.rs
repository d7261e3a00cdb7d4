// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message routing (C8): peek type, find handler, deserialize,
//! post to the Messageboard. `CMsgMulti` and `CMsgClientLogonResponse` get
//! an extra "wait until every subscriber has released this message" step
//! before the dispatcher reads the next packet (§4.8).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use prost::Message as _;
use std::io::Read;

use crate::error::{ClientError, Result};
use crate::messageboard::Messageboard;
use crate::proto::{CMsgClientLogonResponse, CMsgMulti};
use crate::wire::message::MessageType;
use crate::wire::{decode_message, peek_message_type};

/// Bundles a decoded `CMsgClientLogonResponse` with the `client_sessionid`
/// carried on the same packet's protobuf header. The generic typed-handler
/// table posts only the decoded body, discarding the header — the session
/// id has nowhere else to come from, so `CMsgClientLogonResponse` is routed
/// like `ServiceMethod`/`ServiceMethodResponse` instead of through
/// [`Dispatcher::register`].
#[derive(Debug, Clone)]
pub struct ClientLogonResponseMessage {
    pub session_id: i32,
    pub response: CMsgClientLogonResponse,
}

trait HandlerEntry {
    fn dispatch(&self, body: &[u8], mb: &Rc<RefCell<Messageboard>>) -> Result<DispatchOutcome>;
}

/// Whether the dispatcher must await subscriber drain before continuing.
enum DispatchOutcome {
    Done,
    AwaitDrain(Box<dyn Fn() -> bool>),
}

struct TypedHandler<T> {
    drain: bool,
    _marker: std::marker::PhantomData<T>,
}

impl<T> HandlerEntry for TypedHandler<T>
where
    T: prost::Message + Default + Send + Sync + 'static,
{
    fn dispatch(&self, body: &[u8], mb: &Rc<RefCell<Messageboard>>) -> Result<DispatchOutcome> {
        let payload = T::decode(body).map_err(crate::error::DataError::Protobuf)?;
        let arc = Arc::new(payload);
        mb.borrow_mut().send(arc.clone());
        if self.drain {
            let weak = Arc::downgrade(&arc);
            drop(arc);
            Ok(DispatchOutcome::AwaitDrain(Box::new(move || {
                weak.strong_count() == 0
            })))
        } else {
            Ok(DispatchOutcome::Done)
        }
    }
}

/// Polls `is_drained` on a short cadence until it reports true or a bound
/// elapses. This is the idiomatic stand-in for the C++ `DestructMonitor`
/// callback per spec §9: instead of a destructor hook, we watch the
/// posted `Arc`'s strong count return to zero (every subscriber queue
/// having dropped its clone or been drained).
async fn await_drain(is_drained: Box<dyn Fn() -> bool>) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if is_drained() || tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::task::yield_now().await;
    }
}

pub struct Dispatcher {
    handlers: HashMap<MessageType, Box<dyn HandlerEntry>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for `msg_type` that deserializes bodies as `T`
    /// and posts them to the messageboard. `drain` requests the
    /// destruct-monitor-equivalent wait described in §4.8; only
    /// `CMsgMulti` and `CMsgClientLogonResponse` need it.
    pub fn register<T>(&mut self, msg_type: MessageType, drain: bool)
    where
        T: prost::Message + Default + Send + Sync + 'static,
    {
        self.handlers.insert(
            msg_type,
            Box::new(TypedHandler::<T> {
                drain,
                _marker: std::marker::PhantomData,
            }),
        );
    }

    pub fn with_defaults() -> Self {
        let mut d = Self::new();
        d.register::<CMsgMulti>(MessageType::Multi, true);
        d.register::<crate::proto::CMsgClientHeartBeat>(MessageType::ClientHeartBeat, false);
        d.register::<crate::proto::CMsgClientLicenseList>(MessageType::ClientLicenseList, false);
        d.register::<crate::proto::CMsgClientPicsProductInfoResponse>(
            MessageType::ClientPicsProductInfoResponse,
            false,
        );
        d
    }

    /// Processes one raw packet body: peeks the type, dispatches to the
    /// registered handler (if any; unknown types are logged and dropped),
    /// and — for `CMsgMulti` — recursively expands and dispatches the
    /// inner sub-packets before returning, preserving their order relative
    /// to the next outer packet (§8 invariant 7).
    ///
    /// `ServiceMethod`/`ServiceMethodResponse` bypass the generic handler
    /// table: their concrete payload type is only known to the in-flight
    /// caller (§4.9), so they are routed straight to the unified-messaging
    /// client instead.
    pub async fn process_packet(
        &self,
        body: &[u8],
        mb: &Rc<RefCell<Messageboard>>,
        unified: &crate::unified::UnifiedClient,
    ) -> Result<()> {
        let msg_type = peek_message_type(body)?;

        if msg_type == MessageType::ServiceMethodResponse {
            let decoded = decode_message(body)?;
            if let crate::wire::message::Header::ProtoBuf(header) = decoded.header {
                unified.deliver_response(crate::unified::ServiceMethodResponseMessage {
                    header,
                    body: decoded.body,
                });
            }
            return Ok(());
        }
        if msg_type == MessageType::ServiceMethod {
            let decoded = decode_message(body)?;
            if let crate::wire::message::Header::ProtoBuf(header) = decoded.header {
                unified.deliver_push(crate::unified::ServiceMethodMessage {
                    header,
                    body: decoded.body,
                });
            }
            return Ok(());
        }
        if msg_type == MessageType::ClientLogOnResponse {
            let decoded = decode_message(body)?;
            if let crate::wire::message::Header::ProtoBuf(header) = decoded.header {
                let response = CMsgClientLogonResponse::decode(&decoded.body[..])
                    .map_err(crate::error::DataError::Protobuf)?;
                let msg = Arc::new(ClientLogonResponseMessage {
                    session_id: header.client_sessionid,
                    response,
                });
                let weak = Arc::downgrade(&msg);
                mb.borrow_mut().send(msg);
                await_drain(Box::new(move || weak.strong_count() == 0)).await;
            }
            return Ok(());
        }

        let Some(handler) = self.handlers.get(&msg_type) else {
            tracing::debug!(?msg_type, "no handler registered; dropping");
            return Ok(());
        };

        let decoded = decode_message(body)?;
        let outcome = handler.dispatch(&decoded.body, mb)?;
        if let DispatchOutcome::AwaitDrain(is_drained) = outcome {
            await_drain(is_drained).await;
        }

        if msg_type == MessageType::Multi {
            self.expand_multi(&decoded.body, mb, unified).await?;
        }
        Ok(())
    }

    /// Inflates (if `size_unzipped != 0`) and walks a `CMsgMulti` payload's
    /// `[size u32][bytes]` sequence of inner framed packets, feeding each
    /// one back into `process_packet`.
    async fn expand_multi(
        &self,
        multi_body: &[u8],
        mb: &Rc<RefCell<Messageboard>>,
        unified: &crate::unified::UnifiedClient,
    ) -> Result<()> {
        let multi = CMsgMulti::decode(multi_body).map_err(crate::error::DataError::Protobuf)?;
        let inflated = if multi.size_unzipped != 0 {
            let mut decoder = GzDecoder::new(&multi.message_body[..]);
            let mut out = Vec::with_capacity(multi.size_unzipped as usize);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| ClientError::Transport(format!("gzip inflate failed: {e}")))?;
            out
        } else {
            multi.message_body.clone()
        };

        let mut offset = 0usize;
        while offset + 4 <= inflated.len() {
            let size = u32::from_le_bytes([
                inflated[offset],
                inflated[offset + 1],
                inflated[offset + 2],
                inflated[offset + 3],
            ]) as usize;
            offset += 4;
            if offset + size > inflated.len() {
                tracing::warn!("CMsgMulti sub-packet length exceeds remaining bytes");
                break;
            }
            let sub_packet = &inflated[offset..offset + size];
            Box::pin(self.process_packet(sub_packet, mb, unified)).await?;
            offset += size;
        }
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

