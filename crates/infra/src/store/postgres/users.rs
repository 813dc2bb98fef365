use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use loyalty_core::{User, UserId};

use super::{PostgresStore, map_sqlx_error};
use crate::store::{StoreResult, UserStore};

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    login: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            password: row.try_get("password")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            login: row.login,
            password_hash: row.password,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, password_hash), err)]
    async fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, login, password)
            VALUES ($1, $2, $3)
            RETURNING id, login, password, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(login)
        .bind(password_hash)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self), err)]
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, login, password, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_login", e))?;

        Ok(row.map(Into::into))
    }
}
