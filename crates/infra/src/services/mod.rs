//! Application services: the use cases the HTTP layer exposes.

mod auth;
mod balance;
mod orders;

use thiserror::Error;

use loyalty_auth::{JwtError, PasswordError};
use loyalty_core::DomainError;

use crate::store::StoreError;

pub use auth::AuthService;
pub use balance::BalanceService;
pub use orders::{OrderService, SubmitOutcome};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Validation or business-rule failure; safe to show to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure failure.
    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientFunds => ServiceError::Domain(DomainError::InsufficientFunds),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
