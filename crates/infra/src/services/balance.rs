use std::sync::Arc;

use tracing::{info, instrument};

use loyalty_core::{Balance, DomainError, OrderNumber, Points, UserId, Withdrawal, balance::{ensure_cents, ensure_positive}};

use super::ServiceResult;
use crate::store::{LedgerStore, WithdrawalStore};

#[derive(Clone)]
pub struct BalanceService {
    ledger: Arc<dyn LedgerStore>,
    withdrawals: Arc<dyn WithdrawalStore>,
}

impl BalanceService {
    pub fn new(ledger: Arc<dyn LedgerStore>, withdrawals: Arc<dyn WithdrawalStore>) -> Self {
        Self { ledger, withdrawals }
    }

    pub async fn balance(&self, user_id: UserId) -> ServiceResult<Balance> {
        Ok(self.ledger.balance(user_id).await?)
    }

    /// Spend `sum` points against the payment reference `raw_number`.
    #[instrument(skip(self), fields(user_id = %user_id, sum = %sum))]
    pub async fn withdraw(&self, user_id: UserId, raw_number: &str, sum: Points) -> ServiceResult<Withdrawal> {
        if raw_number.trim().is_empty() {
            return Err(DomainError::validation("order number is required").into());
        }
        ensure_positive(sum)?;
        ensure_cents(sum)?;
        let number = OrderNumber::parse(raw_number)?;

        let withdrawal = self.ledger.debit(user_id, &number, sum).await?;
        info!(order = %number, "withdrawal processed");
        Ok(withdrawal)
    }

    /// The user's withdrawals, newest first.
    pub async fn withdrawals(&self, user_id: UserId) -> ServiceResult<Vec<Withdrawal>> {
        Ok(self.withdrawals.list_withdrawals(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::services::ServiceError;
    use crate::store::InMemoryStore;

    fn service() -> (BalanceService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (BalanceService::new(store.clone(), store.clone()), store)
    }

    #[tokio::test]
    async fn withdraw_debits_and_records() {
        let (svc, store) = service();
        let user = UserId::new();
        store.credit(user, dec!(729.98)).await.unwrap();

        let w = svc.withdraw(user, "2377225624", dec!(751) - dec!(100)).await.unwrap();
        assert_eq!(w.sum, dec!(651));

        let b = svc.balance(user).await.unwrap();
        assert_eq!((b.current, b.withdrawn), (dec!(78.98), dec!(651)));
        assert_eq!(svc.withdrawals(user).await.unwrap(), vec![w]);
    }

    #[tokio::test]
    async fn insufficient_funds_surface_as_domain_error() {
        let (svc, store) = service();
        let user = UserId::new();
        store.credit(user, dec!(10)).await.unwrap();

        let err = svc.withdraw(user, "2377225624", dec!(11)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InsufficientFunds)));
        assert_eq!(svc.balance(user).await.unwrap().current, dec!(10));
        assert!(svc.withdrawals(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_requests_never_touch_the_ledger() {
        let (svc, store) = service();
        let user = UserId::new();
        store.credit(user, dec!(10)).await.unwrap();

        assert!(matches!(
            svc.withdraw(user, "2377225625", dec!(1)).await.unwrap_err(),
            ServiceError::Domain(DomainError::InvalidOrderNumber(_))
        ));
        assert!(matches!(
            svc.withdraw(user, "2377225624", dec!(0)).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.withdraw(user, "2377225624", dec!(0.004)).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.withdraw(user, "", dec!(1)).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));
        let b = svc.balance(user).await.unwrap();
        assert_eq!((b.current, b.withdrawn), (dec!(10), dec!(0)));
        assert!(svc.withdrawals(user).await.unwrap().is_empty());
    }
}
