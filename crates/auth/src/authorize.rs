use std::collections::HashSet;

use thiserror::Error;

use labstock_core::UserId;

use crate::{Capability, Role};

/// A fully resolved acting user for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API layer
/// derives one from validated token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub capabilities: Vec<Capability>,
}

impl Principal {
    /// Resolve a principal from claims-derived roles via the static
    /// role→capability policy.
    pub fn from_roles(user_id: UserId, roles: Vec<Role>) -> Self {
        let capabilities = capabilities_for_roles(&roles);
        Self {
            user_id,
            roles,
            capabilities,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(String),
}

/// The single capability check consulted before every gated operation.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Capability) -> Result<(), AuthzError> {
    let caps: HashSet<&str> = principal.capabilities.iter().map(|c| c.as_str()).collect();

    if caps.contains("*") || caps.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Static role→capability policy.
///
/// `admin` grants everything; every authenticated role may read and record
/// stock movements. Registry mutations (create/update/delete/import) are
/// admin-only by virtue of requiring `components.write`.
pub fn capabilities_for_roles(roles: &[Role]) -> Vec<Capability> {
    if roles.iter().any(Role::is_admin) {
        return vec![Capability::new("*")];
    }

    vec![
        Capability::new("components.read"),
        Capability::new("stock.read"),
        Capability::new("stock.move"),
        Capability::new("dashboard.read"),
    ]
}
