use uuid::Uuid;

use crate::{error::AuthError, repository::RepositoryState};

/// IdentityResolver
///
/// Maps an external identity (token subject) to the internal user id. One storage
/// round-trip per call, no retries, no caching across requests.
#[derive(Clone)]
pub struct IdentityResolver {
    repo: RepositoryState,
}

impl IdentityResolver {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn resolve(&self, external_id: &str) -> Result<Uuid, AuthError> {
        match self.repo.find_internal_id_by_external_id(external_id).await {
            Ok(Some(internal_id)) => Ok(internal_id),
            Ok(None) => Err(AuthError::UserNotFound {
                external_id: external_id.to_string(),
            }),
            Err(e) => {
                tracing::error!(external_id, error = %e, "identity lookup failed");
                Err(AuthError::InternalFault(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::UserRecord,
        repository::{Repository, RepositoryError},
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubRepo {
        known: Option<(&'static str, Uuid)>,
        broken: bool,
    }

    #[async_trait]
    impl Repository for StubRepo {
        async fn find_internal_id_by_external_id(
            &self,
            external_id: &str,
        ) -> Result<Option<Uuid>, RepositoryError> {
            if self.broken {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self
                .known
                .filter(|(known, _)| *known == external_id)
                .map(|(_, id)| id))
        }

        async fn create_user(&self, _external_id: &str) -> Result<Uuid, RepositoryError> {
            Ok(Uuid::nil())
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn resolver(known: Option<(&'static str, Uuid)>, broken: bool) -> IdentityResolver {
        IdentityResolver::new(Arc::new(StubRepo { known, broken }))
    }

    #[tokio::test]
    async fn test_resolve_known_user() {
        let id = Uuid::from_u128(7);
        let result = resolver(Some(("user_a", id)), false).resolve("user_a").await;
        assert_eq!(result, Ok(id));
    }

    #[tokio::test]
    async fn test_resolve_unknown_user() {
        let result = resolver(None, false).resolve("user_missing").await;
        assert_eq!(
            result,
            Err(AuthError::UserNotFound {
                external_id: "user_missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal_fault() {
        let result = resolver(None, true).resolve("user_a").await;
        assert!(matches!(result, Err(AuthError::InternalFault(_))));
    }
}
