use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use labstock_analytics::{chart_series, dashboard_snapshot, monthly_totals};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/charts", get(charts))
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::RangeQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "dashboard.read") {
        return resp;
    }

    let (components, logs) = match services.dashboard_rows().await {
        Ok(rows) => rows,
        Err(e) => return errors::service_error_to_response(e),
    };

    let snapshot = dashboard_snapshot(&components, &logs, query.into_range(), Utc::now());
    (StatusCode::OK, Json(snapshot)).into_response()
}

pub async fn charts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::RangeQuery>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&principal, "dashboard.read") {
        return resp;
    }

    let (_, logs) = match services.dashboard_rows().await {
        Ok(rows) => rows,
        Err(e) => return errors::service_error_to_response(e),
    };

    let buckets = monthly_totals(&logs, query.into_range());
    (StatusCode::OK, Json(chart_series(&buckets))).into_response()
}
