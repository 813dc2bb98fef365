//! Port to the external accrual service.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use loyalty_core::{OrderNumber, OrderStatus, Points};

pub use http::{DEFAULT_RETRY_AFTER, HttpAccrualGateway, REQUEST_TIMEOUT};

/// What the accrual service knows about an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// Known to the service. `accrual` is whatever it reported.
    Registered {
        status: OrderStatus,
        accrual: Option<Points>,
    },
    /// Not registered yet; ask again later.
    NotRegistered,
    /// Back off for `retry_after` before the next request.
    Throttled { retry_after: Duration },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("accrual service unavailable: {0}")]
    Unavailable(String),

    #[error("accrual request failed: {0}")]
    Transport(String),

    #[error("malformed accrual response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AccrualGateway: Send + Sync {
    async fn fetch(&self, number: &OrderNumber) -> Result<AccrualOutcome, GatewayError>;
}
