use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::UserContext;

pub async fn list_withdrawals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Response {
    match services.balance.withdrawals(user.user_id()).await {
        Ok(list) if list.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(list) => Json(
            list.into_iter()
                .map(dto::WithdrawalResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
