use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod balance;
pub mod orders;
pub mod system;
pub mod withdrawals;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/ping", get(system::ping))
        .route("/api/user/register", post(auth::register))
        .route("/api/user/login", post(auth::login))
}

/// Endpoints that require an authenticated user.
pub fn protected_router() -> Router {
    Router::new()
        .route("/api/user/orders", post(orders::submit_order).get(orders::list_orders))
        .route("/api/user/balance", get(balance::get_balance))
        .route("/api/user/balance/withdraw", post(balance::withdraw))
        .route("/api/user/withdrawals", get(withdrawals::list_withdrawals))
}
