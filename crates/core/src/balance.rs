//! Spendable balances and the withdrawal audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{UserId, WithdrawalId};
use crate::order::OrderNumber;

/// Loyalty points. Exact decimal arithmetic, never floating point.
pub type Points = Decimal;

/// Points carry at most two decimal places.
pub const POINTS_SCALE: u32 = 2;

/// Largest value a balance column can hold (`NUMERIC(15,2)`).
pub const MAX_POINTS: Points = Decimal::from_parts(2_764_472_319, 232_830, 0, false, POINTS_SCALE);

/// A user's balance.
///
/// `current` is spendable, `withdrawn` is the lifetime total debited.
/// Both are non-negative; `withdrawn` never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    pub current: Points,
    pub withdrawn: Points,
}

impl Balance {
    /// The balance of a user with no credits and no debits.
    pub fn zero(user_id: UserId) -> Self {
        Self {
            user_id,
            current: Decimal::ZERO,
            withdrawn: Decimal::ZERO,
        }
    }

    /// Add an accrual to the spendable balance.
    pub fn credit(&mut self, amount: Points) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        self.current = checked_sum(self.current, amount)?;
        Ok(())
    }

    /// Move `amount` from `current` to `withdrawn`.
    ///
    /// Leaves the balance untouched when funds are insufficient.
    pub fn debit(&mut self, amount: Points) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        if self.current < amount {
            return Err(DomainError::InsufficientFunds);
        }
        let withdrawn = checked_sum(self.withdrawn, amount)?;
        self.current -= amount;
        self.withdrawn = withdrawn;
        Ok(())
    }
}

/// Immutable record of a successful debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    /// Payment reference supplied by the user (Luhn-valid, not necessarily
    /// a submitted purchase order).
    pub order_number: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(user_id: UserId, order_number: OrderNumber, sum: Points, processed_at: DateTime<Utc>) -> Self {
        Self {
            id: WithdrawalId::new(),
            user_id,
            order_number,
            sum,
            processed_at,
        }
    }
}

/// Credits and debits must move a strictly positive amount.
pub fn ensure_positive(amount: Points) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(())
}

/// Amounts entering a balance must fit the persisted precision.
pub fn ensure_cents(amount: Points) -> Result<(), DomainError> {
    if amount.normalize().scale() > POINTS_SCALE {
        return Err(DomainError::validation("amount has more than two decimal places"));
    }
    Ok(())
}

fn checked_sum(total: Points, amount: Points) -> Result<Points, DomainError> {
    total
        .checked_add(amount)
        .filter(|sum| *sum <= MAX_POINTS)
        .ok_or_else(|| DomainError::validation("balance out of range"))
}
