//! Persistence ports and their adapters.
//!
//! Every store is shared behind `Arc<dyn …>`; adapters are the in-memory
//! store (dev and tests), Postgres, and the retrying decorators that wrap
//! either one.

pub mod in_memory;
pub mod postgres;
pub mod retrying;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use loyalty_core::{Balance, Order, OrderNumber, OrderStatus, Points, User, UserId, Withdrawal};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use retrying::{
    RetryingLedgerStore, RetryingOrderStore, RetryingUserStore, RetryingWithdrawalStore, store_retry_policy,
};

use crate::retry::RetryPolicy;
use crate::shutdown::Shutdown;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (login, order number).
    #[error("duplicate record")]
    Duplicate,

    #[error("record not found")]
    NotFound,

    #[error("insufficient funds")]
    InsufficientFunds,

    /// Transient connectivity failure; safe to retry.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    /// Shutdown fired while the operation was waiting to retry.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Only connectivity failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Duplicate` when the login is taken.
    async fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User>;

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// `Duplicate` when the number already exists, whoever owns it.
    async fn create_order(&self, user_id: UserId, number: &OrderNumber) -> StoreResult<Order>;

    async fn find_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>>;

    /// Newest first.
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    /// `NEW` and `PROCESSING` orders, oldest first.
    async fn list_pending(&self) -> StoreResult<Vec<Order>>;

    /// `NotFound` when no order has this number.
    async fn update_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Points>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a zeroed balance row if none exists.
    async fn open(&self, user_id: UserId) -> StoreResult<()>;

    /// Add `amount` to the spendable balance, creating the row if needed.
    async fn credit(&self, user_id: UserId, amount: Points) -> StoreResult<()>;

    /// Atomically move `amount` to `withdrawn` and record the withdrawal.
    /// On `InsufficientFunds` nothing changes.
    async fn debit(&self, user_id: UserId, order_number: &OrderNumber, amount: Points) -> StoreResult<Withdrawal>;

    /// A user without a row reads as zero.
    async fn balance(&self, user_id: UserId) -> StoreResult<Balance>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Newest first.
    async fn list_withdrawals(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>>;
}

/// The set of stores the services and the worker run against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub orders: Arc<dyn OrderStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub withdrawals: Arc<dyn WithdrawalStore>,
}

impl Stores {
    /// Use one backend for every port.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + OrderStore + LedgerStore + WithdrawalStore + 'static,
    {
        Self {
            users: backend.clone(),
            orders: backend.clone(),
            ledger: backend.clone(),
            withdrawals: backend,
        }
    }

    /// Wrap every port in a retrying decorator sharing `policy` and `shutdown`.
    pub fn with_retry(self, policy: RetryPolicy<StoreError>, shutdown: Shutdown) -> Self {
        let policy = store_retry_policy(policy);
        Self {
            users: Arc::new(RetryingUserStore::new(self.users, policy.clone(), shutdown.clone())),
            orders: Arc::new(RetryingOrderStore::new(self.orders, policy.clone(), shutdown.clone())),
            ledger: Arc::new(RetryingLedgerStore::new(self.ledger, policy.clone(), shutdown.clone())),
            withdrawals: Arc::new(RetryingWithdrawalStore::new(self.withdrawals, policy, shutdown)),
        }
    }
}
