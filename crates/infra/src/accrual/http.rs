use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use tracing::{debug, instrument};

use loyalty_core::{OrderNumber, OrderStatus, Points, balance::POINTS_SCALE};

use super::{AccrualGateway, AccrualOutcome, GatewayError};

/// Per-request timeout. The client itself never retries.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cool-down used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct AccrualResponse {
    status: String,
    #[serde(default)]
    accrual: Option<Points>,
}

/// `GET {base}/api/orders/{number}` against the accrual service.
#[derive(Debug, Clone)]
pub struct HttpAccrualGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccrualGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn order_url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

/// Unknown statuses count as not yet processed.
fn map_status(raw: &str) -> OrderStatus {
    match raw {
        "REGISTERED" => OrderStatus::New,
        "PROCESSING" => OrderStatus::Processing,
        "INVALID" => OrderStatus::Invalid,
        "PROCESSED" => OrderStatus::Processed,
        _ => OrderStatus::New,
    }
}

fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[async_trait]
impl AccrualGateway for HttpAccrualGateway {
    #[instrument(skip(self), fields(order = %number), err)]
    async fn fetch(&self, number: &OrderNumber) -> Result<AccrualOutcome, GatewayError> {
        let response = self
            .client
            .get(self.order_url(number))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body: AccrualResponse = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                debug!(status = %body.status, accrual = ?body.accrual, "accrual service answered");
                Ok(AccrualOutcome::Registered {
                    status: map_status(&body.status),
                    // Balances keep cents; finer precision would be lost on write.
                    accrual: body.accrual.map(|a| a.round_dp(POINTS_SCALE)),
                })
            }
            StatusCode::NO_CONTENT => Ok(AccrualOutcome::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let header = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok());
                Ok(AccrualOutcome::Throttled {
                    retry_after: parse_retry_after(header),
                })
            }
            other => Err(GatewayError::Unavailable(format!("unexpected status {other}"))),
        }
    }
}
