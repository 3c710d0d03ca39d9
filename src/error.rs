/// Unified error types for Coin Shop
use crate::ledger::PaymentFailure;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main error type for the shop
#[derive(Error, Debug)]
pub enum ShopError {
    /// The buyer's browse session is missing or past its TTL
    #[error("Shop session expired.")]
    SessionExpired,

    /// Item token did not resolve, or the item has no stock left
    #[error("Item not found or out of stock.")]
    ItemNotFound,

    /// Lost the race for the last unit
    #[error("Item sold out.")]
    SoldOut,

    /// Neither a supplied nor a stored card is available
    #[error("No card available. Provide a card code.")]
    NoPaymentMethod,

    /// Every attempted payment source was refused or unreachable
    #[error("Payment failed: {0}")]
    PaymentFailed(#[from] PaymentFailure),

    /// The purchase already carries a vote
    #[error("You already voted on this purchase.")]
    AlreadyVoted,

    /// Voter has no purchase from the target shop
    #[error("You must buy from this shop before voting.")]
    NoEligiblePurchase,

    /// Database errors
    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// Validation errors
    #[error("{0}")]
    Validation(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Panel posted too recently
    #[error("Please wait {}s before posting another panel.", .remaining.as_secs())]
    CooldownActive { remaining: Duration },

    /// Uploaded file exceeds the configured limit
    #[error("File too large. Max {}MB.", .max_bytes / (1024 * 1024))]
    FileTooLarge { max_bytes: usize },

    /// File arrived without a live pending upload
    #[error("No pending item. Use /additem first.")]
    NoPendingUpload,

    /// Missing or wrong bot credential / acting user
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShopError {
    /// Stable machine-readable code for the presentation layer
    pub fn code(&self) -> &'static str {
        match self {
            ShopError::SessionExpired => "SessionExpired",
            ShopError::ItemNotFound => "ItemNotFound",
            ShopError::SoldOut => "SoldOut",
            ShopError::NoPaymentMethod => "NoPaymentMethod",
            ShopError::PaymentFailed(_) => "PaymentFailed",
            ShopError::AlreadyVoted => "AlreadyVoted",
            ShopError::NoEligiblePurchase => "NoEligiblePurchase",
            ShopError::Storage(_) => "StorageFailure",
            ShopError::Validation(_) => "InvalidRequest",
            ShopError::NotFound(_) => "NotFound",
            ShopError::CooldownActive { .. } => "CooldownActive",
            ShopError::FileTooLarge { .. } => "FileTooLarge",
            ShopError::NoPendingUpload => "NoPendingUpload",
            ShopError::Unauthorized(_) => "Unauthorized",
            ShopError::RateLimitExceeded => "RateLimitExceeded",
            ShopError::Internal(_) | ShopError::Io(_) => "InternalServerError",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ShopError::SessionExpired => StatusCode::GONE,
            ShopError::ItemNotFound | ShopError::NotFound(_) | ShopError::NoPendingUpload => {
                StatusCode::NOT_FOUND
            }
            ShopError::SoldOut | ShopError::AlreadyVoted => StatusCode::CONFLICT,
            ShopError::NoPaymentMethod | ShopError::PaymentFailed(_) => {
                StatusCode::PAYMENT_REQUIRED
            }
            ShopError::NoEligiblePurchase => StatusCode::FORBIDDEN,
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::CooldownActive { .. } | ShopError::RateLimitExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ShopError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ShopError::Storage(_) | ShopError::Internal(_) | ShopError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body returned to the originating actor
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ShopError to HTTP response
impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ShopError::Storage(_) | ShopError::Internal(_) | ShopError::Io(_) => {
                tracing::error!(error = %self, "Request failed");
                "An error occurred. Please try again later.".to_string() // Don't leak details
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
