//! Purchase orders submitted for accrual.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::Points;
use crate::error::DomainError;
use crate::id::{OrderId, UserId};
use crate::luhn;

/// A Luhn-valid order number.
///
/// Used both for purchase orders and for the payment reference attached to a
/// withdrawal. Construction is the only place the checksum is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Parse and validate an order number. Surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if !luhn::is_valid(trimmed) {
            return Err(DomainError::invalid_order_number(trimmed));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted, not yet seen by the accrual service.
    New,
    /// The accrual service is still computing.
    Processing,
    /// Rejected by the accrual service; never credited.
    Invalid,
    /// Accrual computed; points (if any) credited.
    Processed,
}

impl OrderStatus {
    /// `Invalid` and `Processed` are terminal: the worker stops polling.
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(OrderStatus::New),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "INVALID" => Ok(OrderStatus::Invalid),
            "PROCESSED" => Ok(OrderStatus::Processed),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// A purchase order owned by the user who first submitted its number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: OrderNumber,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Set only for `Processed` orders with a positive accrual.
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl Order {
    /// A freshly submitted order (`NEW`, no accrual).
    pub fn new(user_id: UserId, number: OrderNumber, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::new(),
            number,
            user_id,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// The accrual value to persist alongside `status`.
///
/// Only a processed order keeps a strictly positive amount; every other
/// combination stores nothing.
pub fn persisted_accrual(status: OrderStatus, accrual: Option<Points>) -> Option<Points> {
    match (status, accrual) {
        (OrderStatus::Processed, Some(amount)) if amount > Points::ZERO => Some(amount),
        _ => None,
    }
}
