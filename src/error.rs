use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// AuthError
///
/// The closed set of failures the authentication pipeline can produce. Every step raises
/// the most specific variant it can; the pipeline never reinterprets them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The `Authorization` header is missing, empty, or carries no token after the scheme.
    #[error("empty credentials")]
    EmptyCredentials,

    /// The `Authorization` header uses a scheme other than `Bearer`.
    #[error("invalid authentication type")]
    InvalidAuthenticationType,

    /// Malformed token, bad signature, expired or not-yet-valid token, or broken claims.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The external identity has no internal record.
    #[error("user {external_id} not found")]
    UserNotFound { external_id: String },

    /// The caller is neither an admin nor the owner of the target resource.
    #[error("requires role privilege")]
    RequiresRolePrivilege,

    /// Any unclassified collaborator failure. The detail is for logs only.
    #[error("internal fault: {0}")]
    InternalFault(String),
}

/// ErrorBody
///
/// The JSON body returned to the client for every failure of this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

impl AuthError {
    /// Stable, client-facing name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            AuthError::EmptyCredentials => "EmptyCredentialsError",
            AuthError::InvalidAuthenticationType => "InvalidAuthenticationType",
            AuthError::InvalidCredentials => "InvalidCredentialsError",
            AuthError::UserNotFound { .. } => "UserNotFoundError",
            AuthError::RequiresRolePrivilege => "RequiresRolePrivilegeError",
            AuthError::InternalFault(_) => "InternalServerError",
        }
    }

    /// HTTP status of the error kind.
    ///
    /// `RequiresRolePrivilege` answers 401 rather than 403; existing clients depend on it.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::EmptyCredentials
            | AuthError::InvalidAuthenticationType
            | AuthError::InvalidCredentials
            | AuthError::RequiresRolePrivilege => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            AuthError::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human readable message. Never includes internal detail.
    pub fn message(&self) -> String {
        match self {
            AuthError::EmptyCredentials => {
                "Empty credentials. Please provide a valid token.".to_string()
            }
            AuthError::InvalidAuthenticationType => {
                "Invalid authentication type. Authentication type must be Bearer token."
                    .to_string()
            }
            AuthError::InvalidCredentials => {
                "Invalid credentials. Please provide a valid token.".to_string()
            }
            AuthError::UserNotFound { external_id } => {
                format!("User {external_id} not found. Provide a valid user ID.")
            }
            AuthError::RequiresRolePrivilege => {
                "You do not have the required role to access this resource.".to_string()
            }
            AuthError::InternalFault(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            name: self.name().to_string(),
            message: self.message(),
        }
    }
}

/// Translates the error into `(status, body)` and attaches `WWW-Authenticate: Bearer`.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::EmptyCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidAuthenticationType.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::RequiresRolePrivilege.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UserNotFound {
                external_id: "user_1".to_string()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::InternalFault("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_fault_hides_detail() {
        let body = AuthError::InternalFault("connection refused on 10.0.0.3".to_string()).body();
        assert_eq!(body.name, "InternalServerError");
        assert!(!body.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_user_not_found_message_names_user() {
        let body = AuthError::UserNotFound {
            external_id: "user_2ruH".to_string(),
        }
        .body();
        assert_eq!(body.name, "UserNotFoundError");
        assert_eq!(body.message, "User user_2ruH not found. Provide a valid user ID.");
    }

    #[test]
    fn test_response_carries_www_authenticate() {
        let response = AuthError::RequiresRolePrivilege.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
