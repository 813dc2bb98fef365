use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use loyalty_infra::services::SubmitOutcome;

use crate::app::{dto, errors, services::AppServices};
use crate::context::UserContext;

/// Plain-text body holding the order number.
pub async fn submit_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    body: String,
) -> Response {
    match services.orders.submit(user.user_id(), &body).await {
        Ok(SubmitOutcome::Accepted(_)) => StatusCode::ACCEPTED.into_response(),
        Ok(SubmitOutcome::AlreadySubmitted(_)) => StatusCode::OK.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Response {
    match services.orders.list(user.user_id()).await {
        Ok(orders) if orders.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(orders) => Json(
            orders
                .into_iter()
                .map(dto::OrderResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
