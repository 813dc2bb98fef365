use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use loyalty_core::DomainError;
use loyalty_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal server error")
        }
        ServiceError::Token(e) => {
            error!(error = %e, "token failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "internal server error")
        }
        ServiceError::Password(e) => {
            error!(error = %e, "password hashing failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
        }
        ServiceError::Internal(msg) => {
            error!(error = %msg, "internal failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::InvalidOrderNumber(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_order_number", message)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::InsufficientFunds => json_error(StatusCode::PAYMENT_REQUIRED, "insufficient_funds", message),
        DomainError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid login or password"),
    }
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_infra::store::StoreError;

    #[test]
    fn domain_errors_map_to_distinct_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_order_number("1"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::InsufficientFunds, StatusCode::PAYMENT_REQUIRED),
            (DomainError::Unauthorized, StatusCode::UNAUTHORIZED),
            (DomainError::NotFound, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn infrastructure_errors_are_500() {
        let res = service_error_to_response(ServiceError::Store(StoreError::Connection("down".into())));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
