// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified-messaging RPC (C9): `Service.Method#Version` request/response
//! correlated via `JobID`, with retry on transient `Busy`. Grounded on
//! `Headers/Modules/UnifiedMessageClient.hpp`'s `execute()` retry loop
//! (10 attempts, 10 s apart, `Busy` only) and on `WsBridge`'s
//! correlation-map pattern for the outstanding-call registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use prost::Message as _;
use tokio::sync::oneshot;

use crate::client::ClientHandle;
use crate::error::{ClientError, Result, ResultCode};
use crate::jobid::JobId;
use crate::proto::CMsgProtoBufHeader;
use crate::wire::message::{Header, Message, MessageType};

/// An inbound `ServiceMethodResponse`: the proto header (carrying
/// `jobid_target`/`eresult`) plus the still-undeserialized response bytes.
/// Posted to the messageboard by the dispatcher; [`UnifiedClient`] consumes
/// it directly rather than through the generic typed-handler table, since
/// the concrete payload type is only known to the in-flight caller.
#[derive(Debug, Clone)]
pub struct ServiceMethodResponseMessage {
    pub header: CMsgProtoBufHeader,
    pub body: Vec<u8>,
}

/// An inbound `ServiceMethod` server-push notification.
#[derive(Debug, Clone)]
pub struct ServiceMethodMessage {
    pub header: CMsgProtoBufHeader,
    pub body: Vec<u8>,
}

type PendingSlot = oneshot::Sender<ServiceMethodResponseMessage>;

/// Per-client registry of outstanding unified-messaging calls.
pub struct UnifiedClient {
    pending: RefCell<HashMap<JobId, PendingSlot>>,
    push_handlers: RefCell<HashMap<String, Rc<dyn Fn(ServiceMethodMessage)>>>,
}

impl UnifiedClient {
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(HashMap::new()),
            push_handlers: RefCell::new(HashMap::new()),
        }
    }

    /// Called by the dispatch task when a `ServiceMethodResponse` arrives.
    /// Resolves the matching in-flight call, if any.
    pub fn deliver_response(&self, msg: ServiceMethodResponseMessage) {
        let target = JobId::from_u64(msg.header.jobid_target);
        if let Some(tx) = self.pending.borrow_mut().remove(&target) {
            let _ = tx.send(msg);
        } else {
            tracing::debug!(jobid_target = %target, "unified response for unknown job id");
        }
    }

    /// Called by the dispatch task when a server-push `ServiceMethod`
    /// notification arrives; routes it by `target_job_name`.
    pub fn deliver_push(&self, msg: ServiceMethodMessage) {
        let method = msg.header.target_job_name.clone();
        let handler = self.push_handlers.borrow().get(&method).cloned();
        match handler {
            Some(handler) => handler(msg),
            None => tracing::debug!(method = %method, "no push handler registered"),
        }
    }

    pub fn on_push(&self, method: impl Into<String>, handler: impl Fn(ServiceMethodMessage) + 'static) {
        self.push_handlers
            .borrow_mut()
            .insert(method.into(), Rc::new(handler));
    }

    /// Executes one unified-messaging call, retrying up to
    /// `client.config.unified_retry_count` times with
    /// `client.config.unified_retry_sleep()` between attempts whenever the
    /// response's `eresult == Busy`. The same `JobID` is reused across
    /// retries.
    pub async fn execute<REQ, RESP>(
        &self,
        client: &ClientHandle,
        method_name: &str,
        request: &REQ,
        authed: bool,
    ) -> Result<RESP>
    where
        REQ: prost::Message,
        RESP: prost::Message + Default,
    {
        let job_id = JobId::new();
        let max_retries = client.config.unified_retry_count;
        let mut attempt = 0u32;

        loop {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().insert(job_id, tx);

            self.send_request(client, method_name, request, job_id, authed)
                .await?;

            let response = rx
                .await
                .map_err(|_| ClientError::Transport("connection closed awaiting unified response".into()))?;

            let result = ResultCode::from(response.header.eresult);
            if result == ResultCode::Ok {
                return RESP::decode(&response.body[..])
                    .map_err(|e| ClientError::Protocol(crate::error::DataError::Protobuf(e)));
            }

            if result == ResultCode::Busy && attempt < max_retries {
                attempt += 1;
                tracing::debug!(method = method_name, attempt, "unified call busy; retrying");
                tokio::time::sleep(client.config.unified_retry_sleep()).await;
                continue;
            }

            self.pending.borrow_mut().remove(&job_id);
            return Err(ClientError::Unified(result));
        }
    }

    async fn send_request<REQ: prost::Message>(
        &self,
        client: &ClientHandle,
        method_name: &str,
        request: &REQ,
        job_id: JobId,
        authed: bool,
    ) -> Result<()> {
        let msg_type = if authed {
            MessageType::ServiceMethodCallFromClient
        } else {
            MessageType::ServiceMethodCallFromClientNonAuthed
        };
        let header = CMsgProtoBufHeader {
            jobid_source: job_id.as_u64(),
            target_job_name: method_name.to_string(),
            ..Default::default()
        };
        let body = request.encode_to_vec();
        let msg = Message {
            msg_type,
            header: Header::ProtoBuf(header),
            body,
        };
        let bytes = crate::wire::encode_message(&msg);
        client.send_packet(bytes).await
    }
}

impl Default for UnifiedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobid_round_trips_through_header() {
        let job = JobId::new();
        let header = CMsgProtoBufHeader {
            jobid_target: job.as_u64(),
            ..Default::default()
        };
        assert_eq!(JobId::from_u64(header.jobid_target), job);
    }
}
