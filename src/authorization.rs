use uuid::Uuid;

use crate::{error::AuthError, models::Role};

/// The outcome of the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny(AuthError),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow)
    }

    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            AuthorizationDecision::Allow => Ok(()),
            AuthorizationDecision::Deny(reason) => Err(reason),
        }
    }
}

/// Decides whether the caller may act on the target. First match wins:
/// exempt route, admin role, self access, otherwise deny.
pub fn decide(
    role: Role,
    exempt: bool,
    caller_internal_id: Option<Uuid>,
    target_internal_id: Option<Uuid>,
) -> AuthorizationDecision {
    if exempt {
        return AuthorizationDecision::Allow;
    }
    if role == Role::Admin {
        return AuthorizationDecision::Allow;
    }
    match (caller_internal_id, target_internal_id) {
        (Some(caller), Some(target)) if caller == target => AuthorizationDecision::Allow,
        _ => AuthorizationDecision::Deny(AuthError::RequiresRolePrivilege),
    }
}
