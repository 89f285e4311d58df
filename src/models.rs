use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Role
///
/// The caller's role, resolved exactly once from the optional `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Only the literal `"admin"` grants [`Role::Admin`]; absent, null and unknown
    /// values all fall back to [`Role::User`].
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// AuthorizationContext
///
/// Attached to every request that passed the authentication pipeline. Handlers receive it
/// as an extractor argument. It is built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub role: Role,
    /// External identity (token subject) of the caller.
    pub external_id: String,
    /// Internal id of the caller. `None` on exempt routes, where no lookup happens.
    pub caller_internal_id: Option<Uuid>,
    /// Internal id of the resource being acted upon. Equals the caller's own id on
    /// self-scoped routes; `None` on exempt routes.
    pub target_internal_id: Option<Uuid>,
    pub exempt: bool,
}

impl AuthorizationContext {
    /// Route-level role gate. An admin satisfies any requirement.
    pub fn require_role(&self, required: Role) -> Result<(), AuthError> {
        match (self.role, required) {
            (Role::Admin, _) | (Role::User, Role::User) => Ok(()),
            (Role::User, Role::Admin) => Err(AuthError::RequiresRolePrivilege),
        }
    }
}

/// UserRecord
///
/// A registered user: the internal id and the external identity it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub external_id: String,
}
