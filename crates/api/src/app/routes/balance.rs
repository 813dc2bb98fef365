use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::UserContext;

pub async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Response {
    match services.balance.balance(user.user_id()).await {
        Ok(balance) => Json(dto::BalanceResponse::from(balance)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    body: Result<Json<dto::WithdrawRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return errors::bad_request("expected {\"order\", \"sum\"}");
    };

    match services.balance.withdraw(user.user_id(), &body.order, body.sum).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
