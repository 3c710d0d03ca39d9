/// Purchase Orchestrator - one buy attempt from session to delivery
use crate::{
    catalog::{CatalogStore, NewPurchase},
    db::models::Item,
    error::{ShopError, ShopResult},
    ledger::{resolve_destination_account, Ledger, PaymentReceipt},
    metrics,
    purchase::delivery::{format_receipt, Delivery, DeliveryChannel},
    session::SessionRegistry,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs purchases against the catalog and the ledger.
///
/// Stock is reserved before the buyer is charged and handed back if no
/// payment source works, so a buyer who loses the race for the last unit
/// is never charged.
#[derive(Clone)]
pub struct PurchaseOrchestrator {
    catalog: CatalogStore,
    sessions: Arc<SessionRegistry>,
    ledger: Arc<dyn Ledger>,
    private_channel: Option<Arc<dyn DeliveryChannel>>,
}

impl PurchaseOrchestrator {
    pub fn new(
        catalog: CatalogStore,
        sessions: Arc<SessionRegistry>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            catalog,
            sessions,
            ledger,
            private_channel: None,
        }
    }

    /// Also send each delivery through a private channel
    pub fn with_private_channel(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.private_channel = Some(channel);
        self
    }

    /// Buy `item_token` from the shop the buyer is browsing
    pub async fn purchase(
        &self,
        buyer_id: &str,
        item_token: &str,
        card_code: Option<&str>,
    ) -> ShopResult<Delivery> {
        let result = self.attempt(buyer_id, item_token, card_code).await;
        metrics::record_purchase(outcome_label(&result));
        result
    }

    async fn attempt(
        &self,
        buyer_id: &str,
        item_token: &str,
        card_code: Option<&str>,
    ) -> ShopResult<Delivery> {
        let session = self
            .sessions
            .get_browse(buyer_id)
            .ok_or(ShopError::SessionExpired)?;
        let seller_id = session.owner_id;

        let token = item_token.trim();
        if token.is_empty() {
            return Err(ShopError::Validation(
                "Item name or number is required.".to_string(),
            ));
        }

        let item = self
            .catalog
            .find_item_by_name_or_index(&seller_id, token)
            .await?
            .filter(|item| item.amount > 0)
            .ok_or(ShopError::ItemNotFound)?;

        self.catalog.ensure_user(buyer_id).await?;

        let destination =
            resolve_destination_account(self.ledger.as_ref(), &self.catalog, &seller_id).await;

        if !self.catalog.decrement_stock_if_available(&item.id).await? {
            debug!(buyer = %buyer_id, item = %item.id, "Lost the race for the last unit");
            return Err(ShopError::SoldOut);
        }

        let receipt = match self
            .charge(buyer_id, card_code, &destination, item.price_sats)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.release_reservation(&item.id).await;
                return Err(e);
            }
        };

        let purchase = self
            .catalog
            .complete_sale(NewPurchase {
                buyer_id: buyer_id.to_string(),
                seller_id: seller_id.clone(),
                item_id: item.id.clone(),
                price_sats: item.price_sats,
                tx_id: receipt.tx_id.clone(),
            })
            .await
            .map_err(|e| {
                error!(
                    buyer = %buyer_id,
                    seller = %seller_id,
                    item = %item.id,
                    tx_id = ?receipt.tx_id,
                    error = %e,
                    "Payment captured but sale was not recorded"
                );
                e
            })?;

        info!(
            buyer = %buyer_id,
            seller = %seller_id,
            item = %item.id,
            price_sats = item.price_sats,
            tx_id = ?purchase.tx_id,
            "Purchase completed"
        );

        let delivery = into_delivery(item, purchase);
        self.send_private_copy(buyer_id, &delivery).await;

        Ok(delivery)
    }

    /// Supplied card first, then the stored one
    async fn charge(
        &self,
        buyer_id: &str,
        supplied: Option<&str>,
        destination: &str,
        amount_sats: i64,
    ) -> ShopResult<PaymentReceipt> {
        let supplied = supplied.map(str::trim).filter(|card| !card.is_empty());
        let mut last_failure = None;

        if let Some(card) = supplied {
            match self.ledger.pay(card, destination, amount_sats).await {
                Ok(receipt) => return Ok(receipt),
                Err(failure) => {
                    warn!(buyer = %buyer_id, error = %failure, "Supplied card failed");
                    last_failure = Some(failure);
                }
            }
        }

        let stored = self
            .catalog
            .get_user(buyer_id)
            .await?
            .and_then(|user| user.card_code)
            .filter(|card| Some(card.as_str()) != supplied);

        match (stored, last_failure) {
            (Some(card), _) => self
                .ledger
                .pay(&card, destination, amount_sats)
                .await
                .map_err(ShopError::PaymentFailed),
            (None, Some(failure)) => Err(ShopError::PaymentFailed(failure)),
            (None, None) => Err(ShopError::NoPaymentMethod),
        }
    }

    async fn release_reservation(&self, item_id: &str) {
        match self.catalog.release_stock(item_id).await {
            Ok(true) => debug!(item = %item_id, "Reservation released"),
            Ok(false) => warn!(item = %item_id, "No open reservation left to release"),
            Err(e) => error!(item = %item_id, error = %e, "Failed to release reservation"),
        }
    }

    async fn send_private_copy(&self, buyer_id: &str, delivery: &Delivery) {
        let Some(channel) = &self.private_channel else {
            return;
        };

        if let Err(e) = channel.send(buyer_id, delivery).await {
            debug!(buyer = %buyer_id, error = %e, "Private copy not delivered");
        }
    }
}

fn into_delivery(item: Item, purchase: crate::db::models::Purchase) -> Delivery {
    let filename = if item.original_filename.is_empty() {
        item.name.clone()
    } else {
        item.original_filename
    };

    Delivery {
        receipt: format_receipt(&item.name, purchase.price_sats, purchase.tx_id.as_deref()),
        item_name: item.name,
        filename,
        file: item.file,
        purchase,
    }
}

fn outcome_label(result: &ShopResult<Delivery>) -> &'static str {
    match result {
        Ok(_) => "delivered",
        Err(ShopError::SessionExpired) => "session_expired",
        Err(ShopError::ItemNotFound) => "item_not_found",
        Err(ShopError::SoldOut) => "sold_out",
        Err(ShopError::NoPaymentMethod) => "no_payment_method",
        Err(ShopError::PaymentFailed(_)) => "payment_failed",
        Err(ShopError::Validation(_)) => "invalid",
        Err(_) => "error",
    }
}
