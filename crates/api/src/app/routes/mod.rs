use axum::{routing::get, Router};

pub mod components;
pub mod dashboard;
pub mod stocklogs;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/components", components::router())
        .nest("/stocklogs", stocklogs::router())
        .nest("/dashboard", dashboard::router())
}
