//! Background reconciliation of pending orders against the accrual service.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use loyalty_core::{Order, OrderStatus, order::persisted_accrual};

use crate::accrual::{AccrualGateway, AccrualOutcome};
use crate::shutdown::{Shutdown, ShutdownTrigger};
use crate::store::{LedgerStore, OrderStore};

/// Handle to stop and join a spawned worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: ShutdownTrigger,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the in-flight tick to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "accrual worker task ended abnormally");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccrualWorkerConfig {
    pub poll_interval: Duration,
    pub name: &'static str,
}

impl Default for AccrualWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            name: "accrual-worker",
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick was skipped to honour a throttle cool-down.
    pub cooled_down: bool,
    /// Orders the accrual service was asked about.
    pub polled: usize,
    pub updated: usize,
    pub credited: usize,
    /// Set when the service throttled us and the tick was cut short.
    pub throttled: Option<Duration>,
}

pub struct AccrualWorker {
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn LedgerStore>,
    gateway: Arc<dyn AccrualGateway>,
    config: AccrualWorkerConfig,
    cooldown: Mutex<Duration>,
}

impl AccrualWorker {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn LedgerStore>,
        gateway: Arc<dyn AccrualGateway>,
        config: AccrualWorkerConfig,
    ) -> Self {
        Self {
            orders,
            ledger,
            gateway,
            config,
            cooldown: Mutex::new(Duration::ZERO),
        }
    }

    /// Remaining throttle cool-down.
    pub fn cooldown_remaining(&self) -> Duration {
        *self.cooldown.lock()
    }

    /// Spawn the polling loop on the current runtime.
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let (trigger, shutdown) = Shutdown::channel();
        let join = tokio::spawn(async move { self.run(shutdown).await });
        WorkerHandle {
            shutdown: trigger,
            join: Some(join),
        }
    }

    /// Poll every `poll_interval` until `shutdown` fires.
    pub async fn run(&self, shutdown: Shutdown) {
        let name = self.config.name;
        info!(worker = name, poll_interval_ms = self.config.poll_interval.as_millis() as u64, "accrual worker started");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; start polling one interval in.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = interval.tick() => {
                    let report = self.tick(&shutdown).await;
                    if report.polled > 0 || report.throttled.is_some() {
                        debug!(worker = name, ?report, "accrual tick finished");
                    }
                }
            }
        }

        info!(worker = name, "accrual worker stopped");
    }

    /// One reconciliation pass over pending orders.
    pub async fn tick(&self, shutdown: &Shutdown) -> TickReport {
        let mut report = TickReport::default();

        {
            let mut cooldown = self.cooldown.lock();
            if !cooldown.is_zero() {
                *cooldown = cooldown.saturating_sub(self.config.poll_interval);
                report.cooled_down = true;
                return report;
            }
        }

        let pending = match self.orders.list_pending().await {
            Ok(orders) => orders,
            Err(err) => {
                error!(error = %err, "failed to load pending orders");
                return report;
            }
        };

        for order in pending {
            if shutdown.is_triggered() {
                break;
            }
            if self.reconcile(&order, &mut report).await.is_break() {
                break;
            }
        }

        report
    }

    async fn reconcile(&self, order: &Order, report: &mut TickReport) -> std::ops::ControlFlow<()> {
        use std::ops::ControlFlow;

        report.polled += 1;
        let outcome = match self.gateway.fetch(&order.number).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(order = %order.number, error = %err, "accrual request failed");
                return ControlFlow::Continue(());
            }
        };

        let (status, accrual) = match outcome {
            AccrualOutcome::Throttled { retry_after } => {
                *self.cooldown.lock() = retry_after;
                report.throttled = Some(retry_after);
                warn!(
                    order = %order.number,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "accrual service throttled requests"
                );
                return ControlFlow::Break(());
            }
            AccrualOutcome::NotRegistered => return ControlFlow::Continue(()),
            AccrualOutcome::Registered { status, accrual } => (status, accrual),
        };

        let credit = persisted_accrual(status, accrual);
        if let Err(err) = self.orders.update_status(&order.number, status, credit).await {
            error!(order = %order.number, status = %status, error = %err, "failed to update order status");
            return ControlFlow::Continue(());
        }
        report.updated += 1;

        if let (OrderStatus::Processed, Some(amount)) = (status, credit) {
            match self.ledger.credit(order.user_id, amount).await {
                Ok(()) => {
                    report.credited += 1;
                    info!(order = %order.number, user_id = %order.user_id, accrual = %amount, "accrual credited");
                }
                Err(err) => {
                    // The order is already final, so this credit is never attempted again.
                    error!(
                        order = %order.number,
                        user_id = %order.user_id,
                        accrual = %amount,
                        error = %err,
                        "processed order left uncredited"
                    );
                }
            }
        }

        ControlFlow::Continue(())
    }
}
