// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Steam's EResult enum. Only the variants the core and sample modules
/// actually branch on are named; everything else round-trips as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    InvalidPassword,
    Busy,
    InvalidSignature,
    Expired,
    TryAnotherCM,
    ServiceUnavailable,
    InvalidLoginAuthCode,
    TwoFactorCodeMismatch,
    AuthenticationFailed,
    Other(i32),
}

impl From<i32> for ResultCode {
    fn from(v: i32) -> Self {
        match v {
            1 => ResultCode::Ok,
            5 => ResultCode::InvalidPassword,
            10 => ResultCode::Busy,
            15 => ResultCode::InvalidSignature,
            63 => ResultCode::TryAnotherCM,
            20 => ResultCode::ServiceUnavailable,
            // 88 = proprietary AccountLoginDeniedThrottle family reused in the
            // original for refresh-token expiry; reproduced verbatim since
            // the wire meaning is an Open Question in the upstream source.
            88 => ResultCode::Expired,
            65 => ResultCode::InvalidLoginAuthCode,
            85 => ResultCode::TwoFactorCodeMismatch,
            5100 => ResultCode::AuthenticationFailed,
            other => ResultCode::Other(other),
        }
    }
}

/// Errors surfaced by the framing codec (C1).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("not enough data: needed {needed}, had {available}")]
    NotEnoughData { needed: usize, available: usize },
    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("packet magic mismatch")]
    InvalidMagic,
}

/// Top-level error taxonomy for the client runtime (§7).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Protocol(#[from] DataError),
    #[error("authentication error: {0:?}")]
    Authentication(ResultCode),
    #[error("unsupported confirmation types offered by server")]
    UnsupportedConfirmations,
    #[error("unified messaging error: {0:?}")]
    Unified(ResultCode),
    #[error("operation cancelled")]
    Cancelled,
    #[error("data-file error: {0}")]
    DataFile(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
