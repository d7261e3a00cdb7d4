// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream transport (C2): owns the socket, frames packets, exposes status
//! transitions. Endpoint discovery/rotation is delegated to an external
//! [`EndpointProvider`] collaborator (§6.2).

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::error::{ClientError, Result};
use crate::wire::codec::PacketCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
    GotEof,
    Error,
}

/// External collaborator returning an already-connected, encryption-ready
/// stream, and remembering the last endpoint that reached `Connected`.
#[async_trait]
pub trait EndpointProvider: Send + Sync {
    async fn connect(&self) -> Result<TcpStream>;
    fn store_endpoint(&self, local_addr: std::net::SocketAddr);
}

/// A fixed host:port provider, useful for tests and as the simplest real
/// implementation when CM discovery is handled upstream.
pub struct StaticEndpointProvider {
    pub addr: String,
}

#[async_trait]
impl EndpointProvider for StaticEndpointProvider {
    async fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    fn store_endpoint(&self, _local_addr: std::net::SocketAddr) {}
}

type ReadHalf = SplitStream<Framed<TcpStream, PacketCodec>>;
type WriteHalf = SplitSink<Framed<TcpStream, PacketCodec>, Bytes>;

/// Owns the socket, split into independent read/write halves so the
/// dispatch loop's long-lived `read_packet` suspension never contends
/// with a module's concurrent `write_packet` call — both are `&self`
/// methods over their own `RefCell`, not one shared `&mut self` borrow.
pub struct Connection {
    read: RefCell<Option<ReadHalf>>,
    write: tokio::sync::Mutex<Option<WriteHalf>>,
    status: Cell<Status>,
    local_endpoint: Cell<Option<std::net::SocketAddr>>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            read: RefCell::new(None),
            write: tokio::sync::Mutex::new(None),
            status: Cell::new(Status::Disconnected),
            local_endpoint: Cell::new(None),
        }
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn local_endpoint(&self) -> Option<std::net::SocketAddr> {
        self.local_endpoint.get()
    }

    pub async fn connect(&self, provider: &dyn EndpointProvider) -> Result<()> {
        self.status.set(Status::Connecting);
        match provider.connect().await {
            Ok(stream) => {
                let local_endpoint = stream.local_addr().ok();
                self.local_endpoint.set(local_endpoint);
                if let Some(addr) = local_endpoint {
                    provider.store_endpoint(addr);
                }
                let (write_half, read_half) = Framed::new(stream, PacketCodec::default()).split();
                *self.read.borrow_mut() = Some(read_half);
                *self.write.lock().await = Some(write_half);
                self.status.set(Status::Connected);
                Ok(())
            }
            Err(e) => {
                self.status.set(Status::Error);
                Err(e)
            }
        }
    }

    /// Suspends until a complete framed packet is available; returns an
    /// empty slice on EOF.
    pub async fn read_packet(&self) -> Result<Vec<u8>> {
        let next = {
            let mut read = self.read.borrow_mut();
            let read_half = read
                .as_mut()
                .ok_or_else(|| ClientError::Transport("not connected".into()))?;
            read_half.next().await
        };
        match next {
            Some(Ok(bytes)) => Ok(bytes.to_vec()),
            Some(Err(e)) => {
                self.status.set(Status::Error);
                Err(ClientError::Protocol(e))
            }
            None => {
                self.status.set(Status::GotEof);
                Ok(Vec::new())
            }
        }
    }

    /// Serialized against other writers by an async mutex (not a
    /// `RefCell`): several modules may legitimately want to send at once,
    /// and each must simply wait its turn rather than panic.
    pub async fn write_packet(&self, bytes: Vec<u8>) -> Result<()> {
        let mut write = self.write.lock().await;
        let write_half = write
            .as_mut()
            .ok_or_else(|| ClientError::Transport("not connected".into()))?;
        write_half
            .send(Bytes::from(bytes))
            .await
            .map_err(ClientError::Protocol)
    }

    /// Forces any suspended read/write to return with an error — the
    /// mechanism the scheduler uses to break a stuck I/O task on shutdown.
    pub async fn close(&self) {
        *self.read.borrow_mut() = None;
        *self.write.lock().await = None;
        self.status.set(Status::Disconnected);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
