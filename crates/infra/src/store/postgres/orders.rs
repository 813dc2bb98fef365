use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use loyalty_core::order::persisted_accrual;
use loyalty_core::{Order, OrderId, OrderNumber, OrderStatus, Points, UserId};

use super::{PostgresStore, map_sqlx_error, row_error};
use crate::store::{OrderStore, StoreError, StoreResult};

const ORDER_COLUMNS: &str = "id, user_id, number, status, accrual, uploaded_at";

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    number: String,
    status: String,
    accrual: Option<Points>,
    uploaded_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            number: row.try_get("number")?,
            status: row.try_get("status")?,
            accrual: row.try_get("accrual")?,
            uploaded_at: row.try_get("uploaded_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            number: OrderNumber::parse(&row.number).map_err(|e| row_error("orders", e))?,
            user_id: UserId::from_uuid(row.user_id),
            status: row.status.parse::<OrderStatus>().map_err(|e| row_error("orders", e))?,
            accrual: row.accrual,
            uploaded_at: row.uploaded_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %user_id, order = %number), err)]
    async fn create_order(&self, user_id: UserId, number: &OrderNumber) -> StoreResult<Order> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (id, user_id, number, status) VALUES ($1, $2, $3, $4) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user_id.as_uuid())
        .bind(number.as_str())
        .bind(OrderStatus::New.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_order", e))?;

        row.try_into()
    }

    #[instrument(skip(self), fields(order = %number), err)]
    async fn find_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_number", e))?;

        row.map(Order::try_from).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_user", e))?;

        into_orders(rows)
    }

    #[instrument(skip(self), err)]
    async fn list_pending(&self) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ($1, $2) ORDER BY uploaded_at ASC"
        ))
        .bind(OrderStatus::New.as_str())
        .bind(OrderStatus::Processing.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_pending", e))?;

        into_orders(rows)
    }

    #[instrument(skip(self), fields(order = %number, status = %status), err)]
    async fn update_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Points>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $1, accrual = $2 WHERE number = $3")
            .bind(status.as_str())
            .bind(persisted_accrual(status, accrual))
            .bind(number.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
