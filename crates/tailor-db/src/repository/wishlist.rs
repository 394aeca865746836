//! # Wishlist Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use crate::repository::product::ProductRow;
use tailor_core::WishlistEntry;

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    wishlist_id: String,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

/// Repository for wishlist entries.
#[derive(Debug, Clone)]
pub struct WishlistRepository {
    pool: SqlitePool,
}

impl WishlistRepository {
    /// Creates a new WishlistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WishlistRepository { pool }
    }

    /// Wishlisted products that are still in the catalog, newest first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<WishlistEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT w.id AS wishlist_id, w.created_at AS added_at, p.*
            FROM wishlists w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = ?1 AND p.deleted_at IS NULL
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WishlistEntry {
                id: row.wishlist_id,
                product: row.product.into(),
                added_at: row.added_at,
            })
            .collect())
    }

    /// Adds a product.
    ///
    /// ## Errors
    /// - product missing or deleted → `NotFound`
    /// - already wishlisted → `UniqueViolation`
    pub async fn add(&self, user_id: &str, product_id: &str) -> DbResult<()> {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = ?1 AND deleted_at IS NULL")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        if exists.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        debug!(user_id = %user_id, product_id = %product_id, "Adding to wishlist");

        sqlx::query(
            "INSERT INTO wishlists (id, user_id, product_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(generate_id())
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("product_id", product_id),
            other => other,
        })?;

        Ok(())
    }

    /// Removes a product. Absent entries are `NotFound`.
    pub async fn remove(&self, user_id: &str, product_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Wishlist item", product_id));
        }

        Ok(())
    }
}
