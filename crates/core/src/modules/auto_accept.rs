// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automatically accepts incoming trade offers (C14), grounded on
//! `Sources/Modules/AutoAccept.cpp`: reacts to `IncomingTradeOffers`
//! updates on the Whiteboard, decides per offer from the configured
//! [`Policy`], and POSTs the accept to
//! `steamcommunity.com/tradeoffer/<id>/accept` the way
//! `Sources/DeclineTrade.cpp` POSTs its `/decline` sibling.

use async_trait::async_trait;

use crate::client::ClientHandle;
use crate::error::Result;
use crate::module::Module;
use crate::modules::trade_offers::{IncomingTradeOffers, TradeOffer};
use crate::web::Query;

/// Which offers to accept automatically. Mirrors the original's
/// `SteamBot::AutoAccept::Items` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    #[default]
    None,
    /// Accept only offers where we give nothing away.
    Gifts,
    All,
}

fn should_accept(policy: Policy, offer: &TradeOffer, partner_is_known: bool) -> bool {
    if !partner_is_known {
        return false;
    }
    match policy {
        Policy::None => false,
        Policy::Gifts => offer.my_items.is_empty(),
        Policy::All => true,
    }
}

pub struct AutoAcceptModule {
    policy: Policy,
}

impl AutoAcceptModule {
    pub fn new() -> Self {
        Self { policy: Policy::default() }
    }

    pub fn with_policy(policy: Policy) -> Self {
        Self { policy }
    }

    async fn accept(client: &ClientHandle, tradeoffer_id: u64) -> Result<bool> {
        let url = reqwest::Url::parse(&format!(
            "https://steamcommunity.com/tradeoffer/{tradeoffer_id}/accept"
        ))
        .map_err(|e| crate::error::ClientError::Http(e.to_string()))?;
        let session_id = client.http.session_id().to_string();
        let form = vec![
            ("sessionid".to_string(), session_id),
            ("tradeofferid".to_string(), tradeoffer_id.to_string()),
            ("serverid".to_string(), "1".to_string()),
        ];
        let response = client.http.perform(Query::post_form(url, form)).await?;
        Ok(response.status.is_success())
    }

    async fn handle(&self, client: &ClientHandle, offers: &IncomingTradeOffers) {
        for offer in offers.offers.values() {
            let known = crate::client::is_known_account_id(offer.partner_account_id);
            let accept = should_accept(self.policy, offer, known);
            if accept {
                client.ui.output_text(&format!(
                    "auto-accepting tradeoffer id {}",
                    offer.tradeoffer_id
                ));
                match Self::accept(client, offer.tradeoffer_id).await {
                    Ok(true) => client.ui.output_text("accept succeeded"),
                    Ok(false) => client.ui.output_text("accept FAILED"),
                    Err(e) => tracing::error!(err = %e, "accept request failed"),
                }
            } else {
                tracing::debug!(id = offer.tradeoffer_id, "ignoring tradeoffer");
            }
        }
    }
}

impl Default for AutoAcceptModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Module for AutoAcceptModule {
    fn name(&self) -> &'static str {
        "auto_accept"
    }

    async fn run(&mut self, client: ClientHandle) -> Result<()> {
        if self.policy == Policy::None {
            client.cancel.cancelled().await;
            return Err(crate::error::ClientError::Cancelled);
        }

        let notify = client.whiteboard.borrow_mut().observe::<IncomingTradeOffers>();

        loop {
            tokio::select! {
                _ = client.cancel.cancelled() => return Err(crate::error::ClientError::Cancelled),
                _ = notify.notified() => {}
            }

            let offers = client.whiteboard.borrow().has::<IncomingTradeOffers>().cloned();
            if let Some(offers) = offers {
                self.handle(&client, &offers).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(my_items_empty: bool) -> TradeOffer {
        TradeOffer {
            tradeoffer_id: 1,
            partner_account_id: 42,
            my_items: if my_items_empty {
                Vec::new()
            } else {
                vec![crate::modules::trade_offers::TradeOfferAsset {
                    app_id: 440,
                    context_id: 2,
                    asset_id: 1,
                    amount: 1,
                }]
            },
            their_items: Vec::new(),
            is_our_offer: false,
        }
    }

    #[test]
    fn none_policy_never_accepts() {
        assert!(!should_accept(Policy::None, &offer(true), true));
    }

    #[test]
    fn gifts_policy_only_accepts_when_we_give_nothing() {
        assert!(should_accept(Policy::Gifts, &offer(true), true));
        assert!(!should_accept(Policy::Gifts, &offer(false), true));
    }

    #[test]
    fn unknown_partner_is_never_accepted() {
        assert!(!should_accept(Policy::All, &offer(true), false));
    }
}
