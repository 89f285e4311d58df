use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::AuthError,
    models::{AuthorizationContext, Role, UserRecord},
    repository::RepositoryState,
};

/// create_user
///
/// [Exempt Route] Registers the caller's external id. Idempotent: a caller that already
/// has a record gets its existing internal id back.
pub async fn create_user(
    context: AuthorizationContext,
    State(repo): State<RepositoryState>,
) -> Result<(StatusCode, Json<UserRecord>), AuthError> {
    let id = repo.create_user(&context.external_id).await.map_err(|e| {
        tracing::error!(external_id = %context.external_id, error = %e, "create_user failed");
        AuthError::InternalFault(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UserRecord {
            id,
            external_id: context.external_id,
        }),
    ))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's resolved authorization context.
pub async fn get_me(context: AuthorizationContext) -> Json<AuthorizationContext> {
    Json(context)
}

/// get_user
///
/// [Authenticated Route] Returns the context for a by-id request. Reaching this handler
/// means the caller is either an admin or the owner of `{id}`.
pub async fn get_user(context: AuthorizationContext) -> Json<AuthorizationContext> {
    Json(context)
}

/// list_users
///
/// [Admin Route] Lists every registered user.
pub async fn list_users(
    context: AuthorizationContext,
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<UserRecord>>, AuthError> {
    context.require_role(Role::Admin)?;

    let users = repo.list_users().await.map_err(|e| {
        tracing::error!(error = %e, "list_users failed");
        AuthError::InternalFault(e.to_string())
    })?;

    Ok(Json(users))
}
