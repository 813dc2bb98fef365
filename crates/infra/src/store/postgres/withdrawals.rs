use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use loyalty_core::{OrderNumber, Points, UserId, Withdrawal, WithdrawalId};

use super::{PostgresStore, map_sqlx_error, row_error};
use crate::store::{StoreError, StoreResult, WithdrawalStore};

#[derive(Debug)]
struct WithdrawalRow {
    id: Uuid,
    user_id: Uuid,
    order_number: String,
    sum: Points,
    processed_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for WithdrawalRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(WithdrawalRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            order_number: row.try_get("order_number")?,
            sum: row.try_get("sum")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = StoreError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            order_number: OrderNumber::parse(&row.order_number).map_err(|e| row_error("withdrawals", e))?,
            sum: row.sum,
            processed_at: row.processed_at,
        })
    }
}

#[async_trait]
impl WithdrawalStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_withdrawals(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>> {
        let rows: Vec<WithdrawalRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, order_number, sum, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_withdrawals", e))?;

        rows.into_iter().map(Withdrawal::try_from).collect()
    }
}
