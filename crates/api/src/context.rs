use labstock_auth::Role;
use labstock_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
