//! Store selection and service wiring for the HTTP layer.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use loyalty_auth::JwtIssuer;
use loyalty_infra::Config;
use loyalty_infra::services::{AuthService, BalanceService, OrderService};
use loyalty_infra::shutdown::Shutdown;
use loyalty_infra::store::{InMemoryStore, PostgresStore, Stores};

/// The use cases the routes call into.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub orders: OrderService,
    pub balance: BalanceService,
}

impl AppServices {
    pub fn new(stores: &Stores, tokens: Arc<dyn JwtIssuer>) -> Self {
        Self {
            auth: AuthService::new(stores.users.clone(), stores.ledger.clone(), tokens),
            orders: OrderService::new(stores.orders.clone()),
            balance: BalanceService::new(stores.ledger.clone(), stores.withdrawals.clone()),
        }
    }
}

/// Postgres when a database URI is configured, memory otherwise; either way
/// wrapped in the configured retry policy.
pub async fn build_stores(config: &Config, shutdown: Shutdown) -> anyhow::Result<Stores> {
    let stores = match config.database_uri() {
        Some(uri) => {
            let store = PostgresStore::connect(uri)
                .await
                .context("failed to connect to the database")?;
            info!("using postgres stores");
            Stores::from_backend(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URI not set; data is kept in memory and lost on restart");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
    };

    Ok(stores.with_retry(config.retry_policy(), shutdown))
}
