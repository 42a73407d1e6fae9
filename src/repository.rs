use crate::models::{NewProduct, Product, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Persistence contract used by the concrete route handlers and by the bearer
/// authenticator for user lookups. `Send + Sync` so it can be shared as
/// `Arc<dyn Repository>` across request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persists a new product and returns the stored row.
    async fn create_item(&self, item: NewProduct) -> Result<Product, RepositoryError>;
    /// First product with exactly this name, if any.
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL.
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
    async fn create_item(&self, item: NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, code, description, type, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, name, code, description, type, tags, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.name)
        .bind(item.code)
        .bind(item.description)
        .bind(item.product_type)
        .bind(item.tags)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(product_id = %product.id, name = %product.name, "product stored");
        Ok(product)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, code, description, type, tags, created_at
            FROM products
            WHERE name = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
