use api_gatekeeper::{
    AuthError, AuthorizationContext, Role, handlers,
    models::UserRecord,
    repository::{Repository, RepositoryError, RepositoryState},
};
use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Pre-canned result for `create_user`; lookups are never expected from handlers.
pub struct MockRepoControl {
    pub create_user_result: Option<Uuid>,
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_internal_id_by_external_id(
        &self,
        _external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError> {
        panic!("handlers must not resolve identities themselves");
    }

    async fn create_user(&self, _external_id: &str) -> Result<Uuid, RepositoryError> {
        self.create_user_result
            .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        Ok(vec![UserRecord {
            id: TEST_ID,
            external_id: "user_listed".to_string(),
        }])
    }
}

// --- TEST UTILITIES ---

const TEST_ID: Uuid = Uuid::from_u128(123);
const TEST_ADMIN_ID: Uuid = Uuid::from_u128(456);

fn repo(create_user_result: Option<Uuid>) -> RepositoryState {
    Arc::new(MockRepoControl { create_user_result })
}

fn exempt_context() -> AuthorizationContext {
    AuthorizationContext {
        role: Role::User,
        external_id: "user_new".to_string(),
        caller_internal_id: None,
        target_internal_id: None,
        exempt: true,
    }
}

fn user_context() -> AuthorizationContext {
    AuthorizationContext {
        role: Role::User,
        external_id: "user_plain".to_string(),
        caller_internal_id: Some(TEST_ID),
        target_internal_id: Some(TEST_ID),
        exempt: false,
    }
}

fn admin_context() -> AuthorizationContext {
    AuthorizationContext {
        role: Role::Admin,
        external_id: "user_admin".to_string(),
        caller_internal_id: Some(TEST_ADMIN_ID),
        target_internal_id: Some(TEST_ID),
        exempt: false,
    }
}

// --- HANDLER TESTS ---

#[test]
async fn test_create_user_success() {
    let result = handlers::create_user(exempt_context(), State(repo(Some(TEST_ID)))).await;

    let (status, body) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.id, TEST_ID);
    assert_eq!(body.external_id, "user_new");
}

#[test]
async fn test_create_user_storage_failure_is_internal_fault() {
    let result = handlers::create_user(exempt_context(), State(repo(None))).await;

    assert!(matches!(result, Err(AuthError::InternalFault(_))));
}

#[test]
async fn test_get_me_returns_context() {
    let context = admin_context();
    let response = handlers::get_me(context.clone()).await;
    assert_eq!(response.0, context);
}

#[test]
async fn test_get_user_returns_target() {
    let response = handlers::get_user(admin_context()).await;
    assert_eq!(response.0.target_internal_id, Some(TEST_ID));
    assert_eq!(response.0.caller_internal_id, Some(TEST_ADMIN_ID));
}

#[test]
async fn test_list_users_as_admin() {
    let Json(users) = handlers::list_users(admin_context(), State(repo(None)))
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].external_id, "user_listed");
}

#[test]
async fn test_list_users_requires_admin() {
    let result = handlers::list_users(user_context(), State(repo(None))).await;
    assert!(matches!(result, Err(AuthError::RequiresRolePrivilege)));
}
