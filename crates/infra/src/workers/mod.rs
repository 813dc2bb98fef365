pub mod accrual_worker;
pub mod background;

pub use accrual_worker::{AccrualWorker, AccrualWorkerConfig, TickReport, WorkerHandle};
pub use background::Background;
