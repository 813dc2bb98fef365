use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use loyalty_api::app::{self, AppServices};
use loyalty_auth::Hs256Jwt;
use loyalty_infra::Config;
use loyalty_infra::accrual::HttpAccrualGateway;
use loyalty_infra::shutdown::Shutdown;
use loyalty_infra::workers::{AccrualWorker, AccrualWorkerConfig, Background};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    loyalty_observability::init();

    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set; using insecure dev default");
    }

    let (stop_stores, store_shutdown) = Shutdown::channel();
    let stores = app::services::build_stores(&config, store_shutdown).await?;

    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));
    let gateway = HttpAccrualGateway::new(config.accrual_base_url())
        .context("failed to build the accrual client")?;

    let worker = Arc::new(AccrualWorker::new(
        stores.orders.clone(),
        stores.ledger.clone(),
        Arc::new(gateway),
        AccrualWorkerConfig {
            poll_interval: config.poll_interval(),
            ..AccrualWorkerConfig::default()
        },
    ));
    let background = Background::new(worker.spawn(), stop_stores);

    let services = AppServices::new(&stores, jwt.clone());
    let router = app::build_app(services, jwt);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(address = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await;

    background.stop().await;
    info!("shut down");

    served.context("server error")
}
