use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use labstock_core::StockLogId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(record))
        .route("/:id", get(get_one))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::LogQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "stock.read") {
        return resp;
    }
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(resp) => return resp,
    };

    match services.movements.find(&filter).await {
        Ok(entries) => {
            let body: Vec<_> = entries.iter().map(dto::log_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RecordMovementRequest>,
) -> axum::response::Response {
    let acting = match crate::authz::require(&principal, "stock.move") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let draft = match body.into_draft() {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match services.movements.record(draft, acting.user_id).await {
        Ok((entry, component)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "entry": dto::log_to_json(&entry),
                "component": dto::component_to_json(&component),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "stock.read") {
        return resp;
    }
    let id = match StockLogId::from_str(&id) {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()),
    };

    match services.movements.get(id).await {
        Ok(entry) => (StatusCode::OK, Json(dto::log_to_json(&entry))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
