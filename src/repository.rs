use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserRecord;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Contract for the identity storage collaborator. `external_id` is unique in storage,
/// so a lookup yields at most one internal id.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Returns `Ok(None)` when no user carries this external id.
    async fn find_internal_id_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError>;

    /// Registers the external id, returning the existing internal id when already present.
    async fn create_user(&self, external_id: &str) -> Result<Uuid, RepositoryError>;

    /// Every registered user, ordered by external id.
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Implementation of [`Repository`] backed by the `users` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_internal_id_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// The no-op update makes `RETURNING` yield the existing row on conflict.
    async fn create_user(&self, external_id: &str) -> Result<Uuid, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (external_id) VALUES ($1)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id
            "#,
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, external_id FROM users ORDER BY external_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, external_id)| UserRecord { id, external_id })
            .collect())
    }
}
