//! `loyalty-core`: domain foundation for the loyalty-points backend.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, order and ledger records, and the order-number checksum.

pub mod balance;
pub mod error;
pub mod id;
pub mod luhn;
pub mod order;
pub mod user;

pub use balance::{Balance, Points, Withdrawal};
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, UserId, WithdrawalId};
pub use order::{Order, OrderNumber, OrderStatus};
pub use user::User;
