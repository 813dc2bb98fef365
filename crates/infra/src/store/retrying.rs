//! Decorators that run every store call under a [`RetryPolicy`].
//!
//! Each call gets its own attempt budget. A shutdown during backoff surfaces
//! as [`StoreError::Cancelled`].

use std::sync::Arc;

use async_trait::async_trait;

use loyalty_core::{Balance, Order, OrderNumber, OrderStatus, Points, User, UserId, Withdrawal};

use super::{LedgerStore, OrderStore, StoreError, StoreResult, UserStore, WithdrawalStore};
use crate::retry::{RetryError, RetryPolicy};
use crate::shutdown::Shutdown;

impl From<RetryError<StoreError>> for StoreError {
    fn from(err: RetryError<StoreError>) -> Self {
        match err {
            RetryError::Cancelled => StoreError::Cancelled,
            RetryError::Operation(e) => e,
        }
    }
}

/// The retry policy stores use: only connectivity errors are retried.
pub fn store_retry_policy(policy: RetryPolicy<StoreError>) -> RetryPolicy<StoreError> {
    policy.with_predicate(StoreError::is_retryable)
}

macro_rules! retrying_store {
    ($name:ident, $port:ident) => {
        pub struct $name {
            inner: Arc<dyn $port>,
            policy: RetryPolicy<StoreError>,
            shutdown: Shutdown,
        }

        impl $name {
            pub fn new(inner: Arc<dyn $port>, policy: RetryPolicy<StoreError>, shutdown: Shutdown) -> Self {
                Self {
                    inner,
                    policy,
                    shutdown,
                }
            }
        }
    };
}

retrying_store!(RetryingUserStore, UserStore);
retrying_store!(RetryingOrderStore, OrderStore);
retrying_store!(RetryingLedgerStore, LedgerStore);
retrying_store!(RetryingWithdrawalStore, WithdrawalStore);

#[async_trait]
impl UserStore for RetryingUserStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.create_user(login, password_hash))
            .await?)
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.find_by_login(login))
            .await?)
    }
}

#[async_trait]
impl OrderStore for RetryingOrderStore {
    async fn create_order(&self, user_id: UserId, number: &OrderNumber) -> StoreResult<Order> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.create_order(user_id, number))
            .await?)
    }

    async fn find_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.find_by_number(number))
            .await?)
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.list_by_user(user_id))
            .await?)
    }

    async fn list_pending(&self) -> StoreResult<Vec<Order>> {
        let inner = &self.inner;
        Ok(self.policy.run(&self.shutdown, move || inner.list_pending()).await?)
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Points>,
    ) -> StoreResult<()> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.update_status(number, status, accrual))
            .await?)
    }
}

#[async_trait]
impl LedgerStore for RetryingLedgerStore {
    async fn open(&self, user_id: UserId) -> StoreResult<()> {
        let inner = &self.inner;
        Ok(self.policy.run(&self.shutdown, move || inner.open(user_id)).await?)
    }

    async fn credit(&self, user_id: UserId, amount: Points) -> StoreResult<()> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.credit(user_id, amount))
            .await?)
    }

    async fn debit(&self, user_id: UserId, order_number: &OrderNumber, amount: Points) -> StoreResult<Withdrawal> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.debit(user_id, order_number, amount))
            .await?)
    }

    async fn balance(&self, user_id: UserId) -> StoreResult<Balance> {
        let inner = &self.inner;
        Ok(self.policy.run(&self.shutdown, move || inner.balance(user_id)).await?)
    }
}

#[async_trait]
impl WithdrawalStore for RetryingWithdrawalStore {
    async fn list_withdrawals(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>> {
        let inner = &self.inner;
        Ok(self
            .policy
            .run(&self.shutdown, move || inner.list_withdrawals(user_id))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::store::InMemoryStore;

    /// Fails the first `failures` calls with `error`, then delegates.
    struct Flaky {
        inner: InMemoryStore,
        failures: usize,
        error: StoreError,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, error: StoreError) -> Self {
            Self {
                inner: InMemoryStore::new(),
                failures,
                error,
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LedgerStore for Flaky {
        async fn open(&self, user_id: UserId) -> StoreResult<()> {
            self.check()?;
            self.inner.open(user_id).await
        }

        async fn credit(&self, user_id: UserId, amount: Points) -> StoreResult<()> {
            self.check()?;
            self.inner.credit(user_id, amount).await
        }

        async fn debit(&self, user_id: UserId, n: &OrderNumber, amount: Points) -> StoreResult<Withdrawal> {
            self.check()?;
            self.inner.debit(user_id, n, amount).await
        }

        async fn balance(&self, user_id: UserId) -> StoreResult<Balance> {
            self.check()?;
            self.inner.balance(user_id).await
        }
    }

    fn policy() -> RetryPolicy<StoreError> {
        store_retry_policy(RetryPolicy::new(vec![Duration::from_millis(10); 3]))
    }

    #[tokio::test(start_paused = true)]
    async fn connection_errors_are_retried_through() {
        let flaky = Arc::new(Flaky::new(2, StoreError::Connection("reset".into())));
        let store = RetryingLedgerStore::new(flaky.clone(), policy(), Shutdown::never());
        let user = UserId::new();

        store.credit(user, Points::ONE).await.unwrap();

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(flaky.inner.balance(user).await.unwrap().current, Points::ONE);
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_gets_a_fresh_budget() {
        let flaky = Arc::new(Flaky::new(3, StoreError::Connection("reset".into())));
        let store = RetryingLedgerStore::new(flaky.clone(), policy(), Shutdown::never());

        store.balance(UserId::new()).await.unwrap();
        store.balance(UserId::new()).await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn business_errors_are_not_retried() {
        let flaky = Arc::new(Flaky::new(10, StoreError::InsufficientFunds));
        let store = RetryingLedgerStore::new(flaky.clone(), policy(), Shutdown::never());
        let number = OrderNumber::parse("79927398713").unwrap();

        let err = store.debit(UserId::new(), &number, Points::ONE).await.unwrap_err();
        assert_eq!(err, StoreError::InsufficientFunds);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_error() {
        let flaky = Arc::new(Flaky::new(10, StoreError::Connection("down".into())));
        let store = RetryingLedgerStore::new(flaky.clone(), policy(), Shutdown::never());

        let err = store.open(UserId::new()).await.unwrap_err();
        assert_eq!(err, StoreError::Connection("down".into()));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn shutdown_surfaces_as_cancelled() {
        let flaky = Arc::new(Flaky::new(0, StoreError::Connection("unused".into())));
        let (trigger, shutdown) = Shutdown::channel();
        let store = RetryingLedgerStore::new(flaky.clone(), policy(), shutdown);
        trigger.trigger();

        assert_eq!(store.balance(UserId::new()).await.unwrap_err(), StoreError::Cancelled);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 0);
    }
}
