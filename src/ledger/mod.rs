/// Ledger
///
/// Outbound payments against the external Coin ledger. The orchestrator only
/// sees the `Ledger` trait; `LedgerClient` is the HTTP implementation.

pub mod client;
pub mod retry;

pub use client::LedgerClient;
pub use retry::RetryPolicy;

use crate::catalog::CatalogStore;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Why a payment (or card lookup) did not go through
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentFailure {
    /// No response, or the request timed out
    #[error("Network error: {0}")]
    Network(String),

    /// The ledger answered 404 for the endpoint itself
    #[error("API endpoint not found. Please contact admin.")]
    EndpointMissing,

    /// The ledger refused the transfer
    #[error("{message}")]
    Rejected { status: Option<u16>, message: String },
}

impl PaymentFailure {
    /// Worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentFailure::Network(_))
    }
}

/// Successful transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub tx_id: Option<String>,
    pub date: Option<String>,
}

/// Payment backend
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Move `amount_sats` from the card's account to `to_id`
    async fn pay(
        &self,
        card_code: &str,
        to_id: &str,
        amount_sats: i64,
    ) -> Result<PaymentReceipt, PaymentFailure>;

    /// Ledger account owning a card, if the ledger knows it
    async fn card_owner(&self, card_code: &str) -> Result<Option<String>, PaymentFailure>;
}

/// Ledger account that should receive payments for `user_id`.
///
/// Uses the account behind the user's linked card when the ledger can
/// resolve it; otherwise the platform identity itself, which the ledger
/// also accepts as a destination.
pub async fn resolve_destination_account(
    ledger: &dyn Ledger,
    catalog: &CatalogStore,
    user_id: &str,
) -> String {
    let card_code = match catalog.get_user(user_id).await {
        Ok(user) => user.and_then(|user| user.card_code),
        Err(e) => {
            warn!(user = %user_id, error = %e, "Card lookup failed, paying platform identity");
            None
        }
    };

    let Some(card_code) = card_code else {
        return user_id.to_string();
    };

    match ledger.card_owner(&card_code).await {
        Ok(Some(account)) => account,
        Ok(None) => user_id.to_string(),
        Err(e) => {
            warn!(user = %user_id, error = %e, "Card info lookup failed, paying platform identity");
            user_id.to_string()
        }
    }
}
