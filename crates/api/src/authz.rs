//! API-side authorization guard.
//!
//! Capability checks run at the route boundary, before any service call,
//! keeping domain and infra auth-agnostic.

use axum::http::StatusCode;

use labstock_auth::{authorize, Capability, Principal};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Resolve the request's principal and require one capability.
///
/// Returns the resolved principal (the handler needs its `user_id` for
/// audit stamping) or a ready-made 403 response.
pub fn require(
    context: &PrincipalContext,
    capability: &'static str,
) -> Result<Principal, axum::response::Response> {
    let principal = Principal::from_roles(context.user_id(), context.roles().to_vec());

    authorize(&principal, &Capability::new(capability))
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))?;

    Ok(principal)
}
