use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

use loyalty_core::{Balance, OrderNumber, Points, UserId, Withdrawal, WithdrawalId};

use super::{PostgresStore, map_sqlx_error};
use crate::store::{LedgerStore, StoreError, StoreResult};

#[async_trait]
impl LedgerStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn open(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("INSERT INTO balances (user_id, current, withdrawn) VALUES ($1, 0, 0) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("open_balance", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount), err)]
    async fn credit(&self, user_id: UserId, amount: Points) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, current, withdrawn)
            VALUES ($1, $2, 0)
            ON CONFLICT (user_id) DO UPDATE SET current = balances.current + EXCLUDED.current
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(amount)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("credit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id, order = %order_number, amount = %amount), err)]
    async fn debit(&self, user_id: UserId, order_number: &OrderNumber, amount: Points) -> StoreResult<Withdrawal> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current: Option<Points> = sqlx::query("SELECT current FROM balances WHERE user_id = $1 FOR UPDATE")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_balance", e))?
            .map(|row| row.try_get::<Points, _>("current"))
            .transpose()
            .map_err(|e| map_sqlx_error("lock_balance", e))?;

        match current {
            Some(current) if current >= amount => {}
            other => {
                debug!(current = ?other, "insufficient funds, rolling back");
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::InsufficientFunds);
            }
        }

        sqlx::query("UPDATE balances SET current = current - $1, withdrawn = withdrawn + $1 WHERE user_id = $2")
            .bind(amount)
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("debit_balance", e))?;

        let id = Uuid::now_v7();
        let processed_at: DateTime<Utc> = sqlx::query(
            r#"
            INSERT INTO withdrawals (id, user_id, order_number, sum)
            VALUES ($1, $2, $3, $4)
            RETURNING processed_at
            "#,
        )
        .bind(id)
        .bind(user_id.as_uuid())
        .bind(order_number.as_str())
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_withdrawal", e))?
        .try_get::<DateTime<Utc>, _>("processed_at")
        .map_err(|e| map_sqlx_error("insert_withdrawal", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(id),
            user_id,
            order_number: order_number.clone(),
            sum: amount,
            processed_at,
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn balance(&self, user_id: UserId) -> StoreResult<Balance> {
        let row = sqlx::query("SELECT current, withdrawn FROM balances WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("balance", e))?;

        let Some(row) = row else {
            return Ok(Balance::zero(user_id));
        };

        Ok(Balance {
            user_id,
            current: row.try_get("current").map_err(|e| map_sqlx_error("balance", e))?,
            withdrawn: row.try_get("withdrawn").map_err(|e| map_sqlx_error("balance", e))?,
        })
    }
}
