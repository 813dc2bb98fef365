//! Ordered teardown of the background worker and the stores it writes to.

use tracing::info;

use super::WorkerHandle;
use crate::shutdown::ShutdownTrigger;

/// The running worker plus the signal that cancels store retries.
///
/// The worker is stopped first: a tick in flight still writes through the
/// stores, and cancelling their retries underneath it would leave a processed
/// order uncredited.
#[derive(Debug)]
pub struct Background {
    worker: WorkerHandle,
    stores: ShutdownTrigger,
}

impl Background {
    pub fn new(worker: WorkerHandle, stores: ShutdownTrigger) -> Self {
        Self { worker, stores }
    }

    /// Wait for the in-flight tick to finish, then cancel pending store retries.
    pub async fn stop(self) {
        self.worker.shutdown().await;
        self.stores.trigger();
        info!("background work stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    use loyalty_core::{Order, OrderNumber, OrderStatus, Points, UserId};

    use crate::RetryPolicy;
    use crate::accrual::{AccrualGateway, AccrualOutcome, GatewayError};
    use crate::shutdown::Shutdown;
    use crate::store::{InMemoryStore, LedgerStore, OrderStore, StoreResult, Stores};
    use crate::workers::{AccrualWorker, AccrualWorkerConfig};

    struct Processed;

    #[async_trait]
    impl AccrualGateway for Processed {
        async fn fetch(&self, _: &OrderNumber) -> Result<AccrualOutcome, GatewayError> {
            Ok(AccrualOutcome::Registered {
                status: OrderStatus::Processed,
                accrual: Some(dec!(500)),
            })
        }
    }

    /// Holds the worker between its status write and its credit.
    struct GatedOrders {
        inner: Arc<InMemoryStore>,
        written: Notify,
        release: Notify,
    }

    #[async_trait]
    impl OrderStore for GatedOrders {
        async fn create_order(&self, user_id: UserId, number: &OrderNumber) -> StoreResult<Order> {
            self.inner.create_order(user_id, number).await
        }

        async fn find_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
            self.inner.find_by_number(number).await
        }

        async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
            self.inner.list_by_user(user_id).await
        }

        async fn list_pending(&self) -> StoreResult<Vec<Order>> {
            self.inner.list_pending().await
        }

        async fn update_status(
            &self,
            number: &OrderNumber,
            status: OrderStatus,
            accrual: Option<Points>,
        ) -> StoreResult<()> {
            self.inner.update_status(number, status, accrual).await?;
            self.written.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_the_inflight_credit_land() {
        let store = Arc::new(InMemoryStore::new());
        let gated = Arc::new(GatedOrders {
            inner: store.clone(),
            written: Notify::new(),
            release: Notify::new(),
        });
        let user = UserId::new();
        let number = OrderNumber::parse("79927398713").unwrap();
        store.create_order(user, &number).await.unwrap();

        let (stop_stores, store_shutdown) = Shutdown::channel();
        let stores = Stores {
            users: store.clone(),
            orders: gated.clone(),
            ledger: store.clone(),
            withdrawals: store.clone(),
        }
        .with_retry(RetryPolicy::new(vec![Duration::ZERO]), store_shutdown);

        let worker = Arc::new(AccrualWorker::new(
            stores.orders.clone(),
            stores.ledger.clone(),
            Arc::new(Processed),
            AccrualWorkerConfig {
                poll_interval: Duration::from_millis(10),
                ..AccrualWorkerConfig::default()
            },
        ));
        let background = Background::new(worker.spawn(), stop_stores);

        gated.written.notified().await;
        let stopping = tokio::spawn(background.stop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        gated.release.notify_one();
        stopping.await.unwrap();

        let order = store.find_by_number(&number).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(store.balance(user).await.unwrap().current, dec!(500));
    }
}
