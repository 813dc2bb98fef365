use std::sync::Arc;

use tracing::{info, instrument};

use loyalty_core::{DomainError, Order, OrderNumber, UserId};

use super::ServiceResult;
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Newly recorded; the worker will pick it up.
    Accepted(Order),
    /// The same user submitted this number before.
    AlreadySubmitted(Order),
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Record `raw_number` for `user_id`. The first submitter owns a number.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn submit(&self, user_id: UserId, raw_number: &str) -> ServiceResult<SubmitOutcome> {
        if raw_number.trim().is_empty() {
            return Err(DomainError::validation("order number is required").into());
        }
        let number = OrderNumber::parse(raw_number)?;

        match self.orders.create_order(user_id, &number).await {
            Ok(order) => {
                info!(order = %order.number, "order accepted");
                Ok(SubmitOutcome::Accepted(order))
            }
            Err(StoreError::Duplicate) => {
                let existing = self
                    .orders
                    .find_by_number(&number)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                if existing.is_owned_by(user_id) {
                    Ok(SubmitOutcome::AlreadySubmitted(existing))
                } else {
                    Err(DomainError::conflict("order number belongs to another user").into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The user's orders, newest first.
    pub async fn list(&self, user_id: UserId) -> ServiceResult<Vec<Order>> {
        Ok(self.orders.list_by_user(user_id).await?)
    }
}
