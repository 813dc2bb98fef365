//! Runtime configuration: command-line flags with environment fallbacks.

use std::time::Duration;

use clap::Parser;

use crate::retry::RetryPolicy;

/// Signing secret used when none is configured. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "loyalty-dev-secret";

#[derive(Debug, Clone, Parser)]
#[command(name = "loyalty-api", version, about = "Loyalty points backend")]
pub struct Config {
    /// Listen address; a bare `:port` binds every interface.
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS", default_value = "0.0.0.0:8080")]
    pub run_address: String,

    /// Postgres connection string. Without one, data lives in memory.
    #[arg(short = 'd', long = "database-uri", env = "DATABASE_URI")]
    pub database_uri: Option<String>,

    /// Base URL of the accrual service.
    #[arg(short = 'r', long = "accrual-address", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_system_address: String,

    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "ACCRUAL_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Backoff schedule for store retries; negative values mean no wait.
    #[arg(
        long,
        env = "STORE_RETRY_DELAYS_MS",
        value_delimiter = ',',
        default_value = "1000,3000,5000",
        allow_hyphen_values = true
    )]
    pub retry_delays_ms: Vec<i64>,
}

impl Config {
    pub fn listen_address(&self) -> String {
        if self.run_address.starts_with(':') {
            format!("0.0.0.0{}", self.run_address)
        } else {
            self.run_address.clone()
        }
    }

    /// `None` when unset or blank.
    pub fn database_uri(&self) -> Option<&str> {
        self.database_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
    }

    /// Accrual base URL with a scheme; `http://` is assumed when missing.
    pub fn accrual_base_url(&self) -> String {
        let addr = self.accrual_system_address.trim();
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn retry_policy<E>(&self) -> RetryPolicy<E> {
        RetryPolicy::from_millis(&self.retry_delays_ms)
    }
}
