// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External `Ui` collaborator (§6.2): a single-writer log sink plus an
//! asynchronous "request input of kind K" RPC. The core only depends on
//! this narrow trait; the embedder supplies a real terminal/GUI/headless
//! implementation.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Password,
    EmailGuardCode,
    DeviceGuardCode,
}

/// `Send + Sync` because a `Ui` handle is handed to `Client::launch` on the
/// caller's thread and then lives out its life on the Client's dedicated
/// scheduler thread.
#[async_trait(?Send)]
pub trait Ui: Send + Sync {
    fn output_text(&self, line: &str);

    /// Resolves to the user-entered value, or `None` if the request was
    /// cancelled before an answer arrived.
    async fn request(&self, kind: PromptKind) -> Option<String>;
}

/// A `Ui` that never prompts — useful for tests and for accounts driven
/// entirely by a cached refresh token.
pub struct NullUi;

#[async_trait(?Send)]
impl Ui for NullUi {
    fn output_text(&self, line: &str) {
        tracing::info!(target: "steamcore::ui", "{line}");
    }

    async fn request(&self, _kind: PromptKind) -> Option<String> {
        None
    }
}
