use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use loyalty_core::{
    Balance, DomainError, Order, OrderNumber, OrderStatus, Points, User, UserId, Withdrawal,
    order::persisted_accrual,
};

use super::{LedgerStore, OrderStore, StoreError, StoreResult, UserStore, WithdrawalStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, User>,
    /// Insertion order doubles as upload order.
    orders: Vec<Order>,
    order_index: HashMap<String, usize>,
    balances: HashMap<UserId, Balance>,
    withdrawals: Vec<Withdrawal>,
}

/// Single-process store implementing every persistence port.
///
/// Intended for tests and local runs without a database. Each operation holds
/// one lock for its whole duration, so a debit is atomic with its withdrawal
/// record.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }
}

fn ledger_error(err: DomainError) -> StoreError {
    match err {
        DomainError::InsufficientFunds => StoreError::InsufficientFunds,
        other => StoreError::Database(other.to_string()),
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User> {
        let mut state = self.write()?;
        if state.users.contains_key(login) {
            return Err(StoreError::Duplicate);
        }

        let user = User {
            id: UserId::new(),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(login.to_string(), user.clone());
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(login).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, user_id: UserId, number: &OrderNumber) -> StoreResult<Order> {
        let mut state = self.write()?;
        if state.order_index.contains_key(number.as_str()) {
            return Err(StoreError::Duplicate);
        }

        let order = Order::new(user_id, number.clone(), Utc::now());
        let idx = state.orders.len();
        state.orders.push(order.clone());
        state.order_index.insert(number.as_str().to_string(), idx);
        Ok(order)
    }

    async fn find_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let state = self.read()?;
        Ok(state
            .order_index
            .get(number.as_str())
            .map(|idx| state.orders[*idx].clone()))
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.is_owned_by(user_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(orders)
    }

    async fn list_pending(&self) -> StoreResult<Vec<Order>> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| !o.status.is_final())
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(orders)
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Points>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let idx = *state
            .order_index
            .get(number.as_str())
            .ok_or(StoreError::NotFound)?;

        let order = &mut state.orders[idx];
        order.status = status;
        order.accrual = persisted_accrual(status, accrual);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn open(&self, user_id: UserId) -> StoreResult<()> {
        self.write()?
            .balances
            .entry(user_id)
            .or_insert_with(|| Balance::zero(user_id));
        Ok(())
    }

    async fn credit(&self, user_id: UserId, amount: Points) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .balances
            .entry(user_id)
            .or_insert_with(|| Balance::zero(user_id))
            .credit(amount)
            .map_err(ledger_error)
    }

    async fn debit(&self, user_id: UserId, order_number: &OrderNumber, amount: Points) -> StoreResult<Withdrawal> {
        let mut state = self.write()?;
        let balance = state
            .balances
            .get_mut(&user_id)
            .ok_or(StoreError::InsufficientFunds)?;
        balance.debit(amount).map_err(ledger_error)?;

        let withdrawal = Withdrawal::new(user_id, order_number.clone(), amount, Utc::now());
        state.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn balance(&self, user_id: UserId) -> StoreResult<Balance> {
        Ok(self
            .read()?
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| Balance::zero(user_id)))
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryStore {
    async fn list_withdrawals(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>> {
        let state = self.read()?;
        let mut out: Vec<Withdrawal> = state
            .withdrawals
            .iter()
            .rev()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    fn number(raw: &str) -> OrderNumber {
        OrderNumber::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn duplicate_login_is_rejected() {
        let store = InMemoryStore::new();
        store.create_user("alice", "h").await.unwrap();
        assert_eq!(store.create_user("alice", "h2").await.unwrap_err(), StoreError::Duplicate);
        assert_eq!(store.find_by_login("alice").await.unwrap().unwrap().password_hash, "h");
        assert!(store.find_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn order_numbers_are_globally_unique() {
        let store = InMemoryStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        store.create_order(a, &number("79927398713")).await.unwrap();

        assert_eq!(
            store.create_order(b, &number("79927398713")).await.unwrap_err(),
            StoreError::Duplicate
        );
        let found = store.find_by_number(&number("79927398713")).await.unwrap().unwrap();
        assert_eq!(found.user_id, a);
    }

    #[tokio::test]
    async fn pending_is_oldest_first_and_skips_final() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        for n in ["79927398713", "12345678903", "2377225624"] {
            store.create_order(user, &number(n)).await.unwrap();
        }
        store
            .update_status(&number("12345678903"), OrderStatus::Invalid, None)
            .await
            .unwrap();

        let pending: Vec<String> = store
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.number.into_inner())
            .collect();
        assert_eq!(pending, vec!["79927398713", "2377225624"]);

        let mine = store.list_by_user(user).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.windows(2).all(|w| w[0].uploaded_at >= w[1].uploaded_at));
    }

    #[tokio::test]
    async fn update_status_on_unknown_number_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update_status(&number("79927398713"), OrderStatus::Processed, Some(dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn credit_then_debit_records_withdrawal() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        store.open(user).await.unwrap();
        store.credit(user, dec!(500)).await.unwrap();

        let w = store.debit(user, &number("2377225624"), dec!(200)).await.unwrap();
        assert_eq!(w.sum, dec!(200));

        let b = store.balance(user).await.unwrap();
        assert_eq!((b.current, b.withdrawn), (dec!(300), dec!(200)));
        assert_eq!(store.list_withdrawals(user).await.unwrap(), vec![w]);
    }

    #[tokio::test]
    async fn insufficient_debit_changes_nothing() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        store.credit(user, dec!(10)).await.unwrap();

        let err = store.debit(user, &number("2377225624"), dec!(10.01)).await.unwrap_err();
        assert_eq!(err, StoreError::InsufficientFunds);

        let b = store.balance(user).await.unwrap();
        assert_eq!((b.current, b.withdrawn), (dec!(10), dec!(0)));
        assert!(store.list_withdrawals(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_balance_reads_zero_and_cannot_be_debited() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        assert_eq!(store.balance(user).await.unwrap(), Balance::zero(user));
        assert_eq!(
            store.debit(user, &number("0"), dec!(1)).await.unwrap_err(),
            StoreError::InsufficientFunds
        );
    }

    #[tokio::test]
    async fn out_of_range_credit_is_an_error_and_keeps_the_store_usable() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let huge = Points::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);

        store.credit(user, dec!(5)).await.unwrap();
        assert!(matches!(store.credit(user, huge).await, Err(StoreError::Database(_))));
        assert!(matches!(store.credit(user, huge).await, Err(StoreError::Database(_))));

        let b = store.balance(user).await.unwrap();
        assert_eq!(b.current, dec!(5));
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_overdraw() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserId::new();
        store.credit(user, dec!(100)).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.debit(user, &number("79927398713"), dec!(80)).await
            }));
        }

        let mut ok = 0;
        for t in tasks {
            match t.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, StoreError::InsufficientFunds),
            }
        }

        assert_eq!(ok, 1);
        let b = store.balance(user).await.unwrap();
        assert_eq!((b.current, b.withdrawn), (dec!(20), dec!(80)));
    }
}
