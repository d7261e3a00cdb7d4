// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client collaborator consumed by modules only, never by the core
//! transport (§6.2): `perform(Query) -> Response` plus cookie-jar access,
//! mirroring [`crate::connection::EndpointProvider`]'s shape as an external
//! collaborator trait with a default `reqwest`-backed implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

/// One outbound HTTP request: a plain GET, or a form-encoded POST (the
/// trade-offer accept/decline endpoints only take `application/
/// x-www-form-urlencoded` bodies).
#[derive(Debug, Clone)]
pub struct Query {
    pub url: reqwest::Url,
    pub form: Option<Vec<(String, String)>>,
}

impl Query {
    pub fn get(url: reqwest::Url) -> Self {
        Self { url, form: None }
    }

    pub fn post_form(url: reqwest::Url, form: Vec<(String, String)>) -> Self {
        Self {
            url,
            form: Some(form),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: reqwest::StatusCode,
    pub body: bytes::Bytes,
}

impl Response {
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| ClientError::Http(e.to_string()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::Json)
    }
}

/// External collaborator performing HTTP queries with a shared cookie jar,
/// used by the web-session-dependent modules (inventory, trade-offers).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn perform(&self, query: Query) -> Result<Response>;

    /// The CSRF token Steam's web endpoints expect as both a `sessionid`
    /// cookie and a same-named form field on state-changing POSTs (trade
    /// accept/decline). Steam never issues this value itself; the client
    /// picks it and the cookie jar carries it back on every request.
    fn session_id(&self) -> &str;
}

/// The default `reqwest`-backed implementation; a single client instance
/// carries the cookie jar and generated `sessionid` across every request.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    session_id: String,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let session_id = crate::jobid::JobId::new().as_u64().to_string();
        let jar = reqwest::cookie::Jar::default();
        let community_url: reqwest::Url = "https://steamcommunity.com"
            .parse()
            .map_err(|e| ClientError::Http(format!("{e}")))?;
        jar.add_cookie_str(&format!("sessionid={session_id}"), &community_url);
        let client = reqwest::Client::builder()
            .cookie_provider(std::sync::Arc::new(jar))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self { client, session_id })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn perform(&self, query: Query) -> Result<Response> {
        let request = match query.form {
            Some(form) => self.client.post(query.url).form(&form),
            None => self.client.get(query.url),
        };
        let resp = request
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Response { status, body })
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }
}
