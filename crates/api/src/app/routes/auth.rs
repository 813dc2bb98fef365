use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use loyalty_auth::TOKEN_LIFETIME_HOURS;

use crate::app::{dto, errors, services::AppServices};
use crate::middleware::AUTH_COOKIE;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return errors::bad_request("expected {\"login\", \"password\"}");
    };

    match services.auth.register(&body.login, &body.password).await {
        Ok(token) => token_response(&token),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return errors::bad_request("expected {\"login\", \"password\"}");
    };

    match services.auth.login(&body.login, &body.password).await {
        Ok(token) => token_response(&token),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// 200 carrying the token both as a bearer header and as a cookie.
fn token_response(token: &str) -> Response {
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"));
    let cookie = HeaderValue::from_str(&format!(
        "{AUTH_COOKIE}={token}; Path=/; HttpOnly; Max-Age={}",
        TOKEN_LIFETIME_HOURS * 3600
    ));

    match (bearer, cookie) {
        (Ok(bearer), Ok(cookie)) => (
            StatusCode::OK,
            [(header::AUTHORIZATION, bearer), (header::SET_COOKIE, cookie)],
        )
            .into_response(),
        _ => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "internal server error"),
    }
}
