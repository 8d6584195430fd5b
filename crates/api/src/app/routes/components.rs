use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use labstock_registry::{ComponentDraft, ComponentPatch};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/import", post(import))
        .route("/:id", get(get_one).put(update).delete(delete_one))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ComponentQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.read") {
        return resp;
    }

    match services.registry.find(&query.into_filter()).await {
        Ok(components) => {
            let body: Vec<_> = components.iter().map(dto::component_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<ComponentDraft>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.write") {
        return resp;
    }

    match services.registry.create(draft).await {
        Ok(component) => {
            (StatusCode::CREATED, Json(dto::component_to_json(&component))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.read") {
        return resp;
    }
    let id = match dto::parse_component_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.registry.get(id).await {
        Ok(component) => (StatusCode::OK, Json(dto::component_to_json(&component))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(patch): Json<ComponentPatch>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.write") {
        return resp;
    }
    let id = match dto::parse_component_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.registry.update(id, patch).await {
        Ok(component) => (StatusCode::OK, Json(dto::component_to_json(&component))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.write") {
        return resp;
    }
    let id = match dto::parse_component_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.registry.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(drafts): Json<Vec<ComponentDraft>>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "components.write") {
        return resp;
    }

    match services.registry.import(drafts).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
