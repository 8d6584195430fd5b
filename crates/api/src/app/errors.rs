use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use labstock_core::DomainError;
use labstock_infra::{ServiceError, StoreError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Consistency(msg) => {
            tracing::error!(%msg, "consistency violation surfaced to the API");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "consistency_error", msg)
        }
        ServiceError::Store(StoreError::Connection(msg)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        ServiceError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::DuplicateKey(msg) => json_error(StatusCode::CONFLICT, "duplicate_key", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InsufficientStock { requested, available } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            format!("insufficient stock: requested {requested}, available {available}"),
        ),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "unauthorized"),
    }
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
