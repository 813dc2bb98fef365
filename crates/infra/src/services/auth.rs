use std::sync::Arc;

use tracing::{info, instrument};

use loyalty_auth::{JwtIssuer, hash_password, verify_password};
use loyalty_core::DomainError;

use super::{ServiceError, ServiceResult};
use crate::store::{LedgerStore, StoreError, UserStore};

/// Registration and login. Both return a freshly issued bearer token.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn LedgerStore>,
    tokens: Arc<dyn JwtIssuer>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, ledger: Arc<dyn LedgerStore>, tokens: Arc<dyn JwtIssuer>) -> Self {
        Self { users, ledger, tokens }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> ServiceResult<String> {
        ensure_credentials(login, password)?;

        let hash = blocking_hash(password.to_string()).await?;
        let user = match self.users.create_user(login, &hash).await {
            Ok(user) => user,
            Err(StoreError::Duplicate) => return Err(DomainError::conflict("login already taken").into()),
            Err(err) => return Err(err.into()),
        };
        self.ledger.open(user.id).await?;

        info!(user_id = %user.id, "user registered");
        Ok(self.tokens.issue(user.id)?)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> ServiceResult<String> {
        ensure_credentials(login, password)?;

        let Some(user) = self.users.find_by_login(login).await? else {
            return Err(DomainError::Unauthorized.into());
        };

        let stored = user.password_hash.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;
        if !matches {
            return Err(DomainError::Unauthorized.into());
        }

        Ok(self.tokens.issue(user.id)?)
    }
}

fn ensure_credentials(login: &str, password: &str) -> Result<(), DomainError> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(DomainError::validation("login and password are required"));
    }
    Ok(())
}

async fn blocking_hash(password: String) -> ServiceResult<String> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))??)
}
