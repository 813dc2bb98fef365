//! Infrastructure layer: persistence, the accrual client, the reconciliation
//! worker, application services and configuration.

pub mod accrual;
pub mod config;
pub mod retry;
pub mod services;
pub mod shutdown;
pub mod store;
pub mod workers;

pub use config::Config;
pub use retry::{RetryError, RetryPolicy};
pub use shutdown::{Shutdown, ShutdownTrigger};
