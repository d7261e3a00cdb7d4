// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module hot-plug registry (C7). The module factory list is populated by
//! a single function ([`all`]) at startup rather than by constructor
//! side-effects, per spec §9's re-architecture note — there is no portable
//! Rust equivalent of the original's static-initializer registration.

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::Result;

/// A pluggable feature. Modules interact with one another only through the
/// Whiteboard/Messageboard exposed by [`ClientHandle`] and, for
/// cross-client calls, the Executor bridge — never a direct reference to
/// another module.
#[async_trait(?Send)]
pub trait Module {
    fn name(&self) -> &'static str;

    /// Called after every module for this client has been constructed. May
    /// register whiteboard/messageboard observers.
    async fn init(&mut self, client: &ClientHandle) -> Result<()> {
        let _ = client;
        Ok(())
    }

    /// Launched as its own task. Returning normally simply ends the task; a
    /// cancellation error ends it silently; any other error is logged by
    /// the caller and counted as fatal for this task only, not the Client.
    async fn run(&mut self, client: ClientHandle) -> Result<()>;
}

pub trait ModuleFactory {
    fn build(&self) -> Box<dyn Module>;
}

struct FnFactory<F>(F);

impl<F> ModuleFactory for FnFactory<F>
where
    F: Fn() -> Box<dyn Module>,
{
    fn build(&self) -> Box<dyn Module> {
        (self.0)()
    }
}

pub fn factory<F>(f: F) -> Box<dyn ModuleFactory>
where
    F: Fn() -> Box<dyn Module> + 'static,
{
    Box::new(FnFactory(f))
}

/// The set of sample feature modules (C14) wired up at startup. Embedders
/// that only want a subset can call the individual `modules::*::factory()`
/// constructors directly instead of this convenience list.
pub fn all() -> Vec<Box<dyn ModuleFactory>> {
    vec![
        factory(|| Box::new(crate::login::LoginModule::new())),
        factory(|| Box::new(crate::heartbeat::HeartbeatModule::new())),
        factory(|| Box::new(crate::modules::license_list::LicenseListModule::new())),
        factory(|| Box::new(crate::modules::package_data::PackageDataModule::new())),
        factory(|| Box::new(crate::modules::notifications::NotificationsModule::new())),
        factory(|| Box::new(crate::modules::inventory::InventoryModule::new())),
        factory(|| Box::new(crate::modules::trade_offers::TradeOffersModule::new())),
        factory(|| Box::new(crate::modules::play_games::PlayGamesModule::new())),
        factory(|| Box::new(crate::modules::auto_accept::AutoAcceptModule::new())),
        factory(|| Box::new(crate::modules::badge_data::BadgeDataModule::new())),
    ]
}
