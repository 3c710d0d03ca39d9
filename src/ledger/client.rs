/// Ledger Client - HTTP access to the Coin ledger
use crate::{
    config::LedgerConfig,
    error::{ShopError, ShopResult},
    ledger::{Ledger, PaymentFailure, PaymentReceipt, RetryPolicy},
    metrics, money,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    card_code: &'a str,
    to_id: &'a str,
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferResponse {
    #[serde(default)]
    success: bool,
    tx_id: Option<Value>,
    date: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardInfoRequest<'a> {
    card_code: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardInfoResponse {
    #[serde(default)]
    success: bool,
    user_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// reqwest-backed ledger
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl LedgerClient {
    /// Create a client from ledger configuration
    pub fn new(config: &LedgerConfig) -> ShopResult<Self> {
        Self::with_policy(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_step_ms)),
        )
    }

    pub fn with_policy(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> ShopResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Coin-Shop/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| ShopError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn transfer_once(
        &self,
        card_code: &str,
        to_id: &str,
        amount_sats: i64,
    ) -> Result<PaymentReceipt, PaymentFailure> {
        let url = format!("{}/api/transfer/card", self.base_url);
        let body = TransferRequest {
            card_code,
            to_id,
            amount: money::sats_to_coins(amount_sats),
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentFailure::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PaymentFailure::EndpointMissing);
        }
        if !status.is_success() {
            return Err(rejected_from_error_body(response).await);
        }

        let data: TransferResponse = response.json().await.unwrap_or_default();
        if !data.success {
            return Err(PaymentFailure::Rejected {
                status: Some(status.as_u16()),
                message: data.error.unwrap_or_else(|| "Payment failed".to_string()),
            });
        }

        Ok(PaymentReceipt {
            tx_id: data.tx_id.and_then(value_to_string),
            date: Some(data.date.unwrap_or_else(|| Utc::now().to_rfc3339())),
        })
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn pay(
        &self,
        card_code: &str,
        to_id: &str,
        amount_sats: i64,
    ) -> Result<PaymentReceipt, PaymentFailure> {
        let result = self
            .retry
            .run(
                |_| self.transfer_once(card_code, to_id, amount_sats),
                PaymentFailure::is_transient,
            )
            .await;

        match &result {
            Ok(receipt) => {
                metrics::record_ledger_request("transfer", "success");
                debug!(to = %to_id, amount_sats, tx_id = ?receipt.tx_id, "Ledger transfer settled");
            }
            Err(failure) => {
                let outcome = if failure.is_transient() { "network" } else { "rejected" };
                metrics::record_ledger_request("transfer", outcome);
                error!(to = %to_id, amount_sats, error = %failure, "Ledger transfer failed");
            }
        }

        result
    }

    async fn card_owner(&self, card_code: &str) -> Result<Option<String>, PaymentFailure> {
        let url = format!("{}/api/card/info", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&CardInfoRequest { card_code })
            .send()
            .await
            .map_err(|e| {
                metrics::record_ledger_request("card_info", "network");
                PaymentFailure::Network(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            metrics::record_ledger_request("card_info", "rejected");
            return Err(PaymentFailure::EndpointMissing);
        }
        if !status.is_success() {
            metrics::record_ledger_request("card_info", "rejected");
            return Err(rejected_from_error_body(response).await);
        }

        metrics::record_ledger_request("card_info", "success");
        let data: CardInfoResponse = response.json().await.unwrap_or_default();
        if !data.success {
            return Ok(None);
        }
        Ok(data.user_id.and_then(value_to_string))
    }
}

async fn rejected_from_error_body(response: reqwest::Response) -> PaymentFailure {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();

    PaymentFailure::Rejected {
        status: Some(status.as_u16()),
        message: body
            .error
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16())),
    }
}

/// Ledger ids arrive as strings or numbers
fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as HttpStatus, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeLedger {
        hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    async fn transfer(State(fake): State<FakeLedger>, Json(body): Json<Value>) -> (HttpStatus, Json<Value>) {
        fake.hits.fetch_add(1, Ordering::SeqCst);
        *fake.last_body.lock().unwrap() = Some(body.clone());

        match body["cardCode"].as_str() {
            Some("good") => (HttpStatus::OK, Json(json!({"success": true, "txId": "tx-9", "date": "2026-01-01"}))),
            Some("numeric") => (HttpStatus::OK, Json(json!({"success": true, "txId": 77}))),
            Some("declined") => (HttpStatus::OK, Json(json!({"success": false}))),
            Some("poor") => (HttpStatus::BAD_REQUEST, Json(json!({"error": "Insufficient funds"}))),
            Some("slow") => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                (HttpStatus::OK, Json(json!({"success": true})))
            }
            _ => (HttpStatus::INTERNAL_SERVER_ERROR, Json(json!({}))),
        }
    }

    async fn card_info(Json(body): Json<Value>) -> Json<Value> {
        match body["cardCode"].as_str() {
            Some("known") => Json(json!({"success": true, "userId": "acct-1"})),
            _ => Json(json!({"success": false})),
        }
    }

    async fn spawn_ledger(with_routes: bool) -> (String, FakeLedger) {
        let fake = FakeLedger::default();
        let app = if with_routes {
            Router::new()
                .route("/api/transfer/card", post(transfer))
                .route("/api/card/info", post(card_info))
                .with_state(fake.clone())
        } else {
            Router::new()
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), fake)
    }

    fn client(base: &str, timeout: Duration) -> LedgerClient {
        LedgerClient::with_policy(base, timeout, RetryPolicy::new(2, Duration::from_millis(5))).unwrap()
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let (base, fake) = spawn_ledger(true).await;
        let ledger = client(&base, Duration::from_secs(5));

        let receipt = ledger.pay("good", "seller", 250_000_000).await.unwrap();
        assert_eq!(receipt.tx_id.as_deref(), Some("tx-9"));
        assert_eq!(receipt.date.as_deref(), Some("2026-01-01"));

        let body = fake.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["toId"], "seller");
        assert_eq!(body["amount"], 2.5);
    }

    #[tokio::test]
    async fn test_numeric_tx_id() {
        let (base, _fake) = spawn_ledger(true).await;
        let receipt = client(&base, Duration::from_secs(5)).pay("numeric", "s", 1).await.unwrap();

        assert_eq!(receipt.tx_id.as_deref(), Some("77"));
        assert!(receipt.date.is_some());
    }

    #[tokio::test]
    async fn test_unsuccessful_body_is_rejected() {
        let (base, fake) = spawn_ledger(true).await;
        let failure = client(&base, Duration::from_secs(5)).pay("declined", "s", 1).await.unwrap_err();

        assert_eq!(failure.to_string(), "Payment failed");
        assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_body_surfaced_verbatim_without_retry() {
        let (base, fake) = spawn_ledger(true).await;
        let failure = client(&base, Duration::from_secs(5)).pay("poor", "s", 1).await.unwrap_err();

        assert_eq!(
            failure,
            PaymentFailure::Rejected {
                status: Some(400),
                message: "Insufficient funds".to_string()
            }
        );
        assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_endpoint() {
        let (base, _fake) = spawn_ledger(false).await;
        let failure = client(&base, Duration::from_secs(5)).pay("good", "s", 1).await.unwrap_err();

        assert_eq!(failure, PaymentFailure::EndpointMissing);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried_twice() {
        let (base, fake) = spawn_ledger(true).await;
        let failure = client(&base, Duration::from_millis(100)).pay("slow", "s", 1).await.unwrap_err();

        assert!(failure.is_transient());
        assert_eq!(fake.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let failure = client(&base, Duration::from_secs(1)).pay("good", "s", 1).await.unwrap_err();
        assert!(matches!(failure, PaymentFailure::Network(_)));
    }

    #[tokio::test]
    async fn test_card_owner() {
        let (base, _fake) = spawn_ledger(true).await;
        let ledger = client(&base, Duration::from_secs(5));

        assert_eq!(ledger.card_owner("known").await.unwrap().as_deref(), Some("acct-1"));
        assert_eq!(ledger.card_owner("other").await.unwrap(), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let ledger = LedgerClient::with_policy("http://ledger.test/", Duration::from_secs(1), RetryPolicy::none()).unwrap();
        assert_eq!(ledger.base_url(), "http://ledger.test");
    }
}
