//! # Product Repository
//!
//! Catalog reads for the storefront and admin CRUD.
//!
//! ## Listing Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Catalog Filtering Works                          │
//! │                                                                         │
//! │  GET /api/products?category=Kurtas&size=M&sort=price-low                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  One static statement, every filter written as                          │
//! │      (?N IS NULL OR <condition>)                                        │
//! │  so an absent filter binds NULL and matches everything.                 │
//! │       │                                                                 │
//! │       ├── size / color / fabric → EXISTS over product_variants          │
//! │       ├── search                → LIKE on name, description, category   │
//! │       └── rating                → LEFT JOIN reviews, AVG + COUNT        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ORDER BY picked from a fixed set per ProductSort                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, like_pattern};
use tailor_core::commands::{NewProduct, ProductQuery, ProductSort, ProductUpdate};
use tailor_core::{
    CatalogFilters, CategorySummary, Product, ProductDetail, ProductListing, ProductVariant,
    DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS,
};

// =============================================================================
// SQL
// =============================================================================

/// Shared WHERE clause of the listing and its count. Parameters ?1..?9.
macro_rules! catalog_filter {
    () => {
        r#"
        WHERE p.deleted_at IS NULL
          AND (?1 IS NULL OR p.category = ?1 COLLATE NOCASE)
          AND (?2 IS NULL OR p.price_paise >= ?2)
          AND (?3 IS NULL OR p.price_paise <= ?3)
          AND (?4 IS NULL OR EXISTS (
                SELECT 1 FROM product_variants v WHERE v.product_id = p.id AND v.size = ?4))
          AND (?5 IS NULL OR EXISTS (
                SELECT 1 FROM product_variants v WHERE v.product_id = p.id AND v.color = ?5))
          AND (?6 IS NULL OR EXISTS (
                SELECT 1 FROM product_variants v WHERE v.product_id = p.id AND v.fabric = ?6))
          AND (?7 IS NULL OR p.name LIKE ?7 OR p.description LIKE ?7 OR p.category LIKE ?7)
          AND (?8 IS NULL OR p.is_customizable = ?8)
          AND (?9 IS NULL OR p.featured = ?9)
        "#
    };
}

macro_rules! catalog_listing {
    ($order_by:literal) => {
        concat!(
            r#"
            SELECT p.*,
                   COALESCE(AVG(r.rating), 0.0) AS average_rating,
                   COUNT(r.id) AS review_count
            FROM products p
            LEFT JOIN reviews r ON r.product_id = p.id
            "#,
            catalog_filter!(),
            " GROUP BY p.id ORDER BY ",
            $order_by,
            " LIMIT ?10 OFFSET ?11"
        )
    };
}

const LIST_NEWEST: &str = catalog_listing!("p.created_at DESC");
const LIST_PRICE_LOW: &str = catalog_listing!("p.price_paise ASC, p.created_at DESC");
const LIST_PRICE_HIGH: &str = catalog_listing!("p.price_paise DESC, p.created_at DESC");
const LIST_POPULAR: &str =
    catalog_listing!("average_rating DESC, review_count DESC, p.created_at DESC");

const COUNT_LISTING: &str = concat!("SELECT COUNT(*) FROM products p", catalog_filter!());

fn listing_sql(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => LIST_NEWEST,
        ProductSort::PriceLow => LIST_PRICE_LOW,
        ProductSort::PriceHigh => LIST_PRICE_HIGH,
        ProductSort::Popular => LIST_POPULAR,
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    name: String,
    description: Option<String>,
    price_paise: i64,
    original_price_paise: Option<i64>,
    category: String,
    material: Option<String>,
    stock: i64,
    is_customizable: bool,
    custom_price_multiplier_bps: i64,
    featured: bool,
    images: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price_paise: row.price_paise,
            original_price_paise: row.original_price_paise,
            category: row.category,
            material: row.material,
            stock: row.stock,
            is_customizable: row.is_customizable,
            custom_price_multiplier_bps: u32::try_from(row.custom_price_multiplier_bps)
                .unwrap_or(DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS),
            featured: row.featured,
            images: row.images.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    average_rating: f64,
    review_count: i64,
}

impl From<ListingRow> for ProductListing {
    fn from(row: ListingRow) -> Self {
        ProductListing {
            product: row.product.into(),
            average_rating: row.average_rating,
            review_count: row.review_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    size: Option<String>,
    color: Option<String>,
    fabric: Option<String>,
    stock: i64,
    price_adjustment_paise: i64,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        ProductVariant {
            id: row.id,
            product_id: row.product_id,
            size: row.size,
            color: row.color,
            fabric: row.fabric,
            stock: row.stock,
            price_adjustment_paise: row.price_adjustment_paise,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let (page, total) = repo.list(&query, 20, 0).await?;
/// let detail = repo.get_detail("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products matching `query`, returning one page and the
    /// total number of matches.
    ///
    /// `limit`/`offset` are already resolved from the query's page fields.
    pub async fn list(
        &self,
        query: &ProductQuery,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<ProductListing>, i64)> {
        debug!(sort = ?query.sort, limit, offset, "Listing products");

        let search = query.search.as_deref().map(like_pattern);

        let rows: Vec<ListingRow> = sqlx::query_as(listing_sql(query.sort))
            .bind(query.category.as_deref())
            .bind(query.min_price_paise)
            .bind(query.max_price_paise)
            .bind(query.size.as_deref())
            .bind(query.color.as_deref())
            .bind(query.fabric.as_deref())
            .bind(search.as_deref())
            .bind(query.is_customizable)
            .bind(query.featured)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(COUNT_LISTING)
            .bind(query.category.as_deref())
            .bind(query.min_price_paise)
            .bind(query.max_price_paise)
            .bind(query.size.as_deref())
            .bind(query.color.as_deref())
            .bind(query.fabric.as_deref())
            .bind(search.as_deref())
            .bind(query.is_customizable)
            .bind(query.featured)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Free-text search over name, description and category, newest first.
    pub async fn search(&self, term: &str, limit: i64) -> DbResult<Vec<ProductListing>> {
        let query = ProductQuery {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let (rows, _) = self.list(&query, limit, 0).await?;
        Ok(rows)
    }

    /// Gets an active product.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let row: Option<ProductRow> =
            sqlx::query_as("SELECT * FROM products WHERE id = ?1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Into::into)
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Gets an active product with its variants and review summary.
    pub async fn get_detail(&self, id: &str) -> DbResult<ProductDetail> {
        let product = self.get(id).await?;

        let variants: Vec<VariantRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, size, color, fabric, stock, price_adjustment_paise
            FROM product_variants
            WHERE product_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let (average_rating, review_count): (f64, i64) = sqlx::query_as(
            "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM reviews WHERE product_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductDetail {
            product,
            variants: variants.into_iter().map(Into::into).collect(),
            average_rating,
            review_count,
        })
    }

    /// Active categories with product counts, alphabetical.
    pub async fn categories(&self) -> DbResult<Vec<CategorySummary>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT category, COUNT(*)
            FROM products
            WHERE deleted_at IS NULL
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, count)| CategorySummary { name, count })
            .collect())
    }

    /// Distinct filter values and the price range of the active catalog.
    pub async fn filters(&self) -> DbResult<CatalogFilters> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products WHERE deleted_at IS NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        let sizes = self.distinct_variant_values(VariantColumn::Size).await?;
        let colors = self.distinct_variant_values(VariantColumn::Color).await?;
        let fabrics = self.distinct_variant_values(VariantColumn::Fabric).await?;

        let (min_price_paise, max_price_paise): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(MIN(price_paise), 0), COALESCE(MAX(price_paise), 0)
            FROM products
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogFilters {
            categories,
            sizes,
            colors,
            fabrics,
            min_price_paise,
            max_price_paise,
        })
    }

    async fn distinct_variant_values(&self, column: VariantColumn) -> DbResult<Vec<String>> {
        let values: Vec<String> = sqlx::query_scalar(column.distinct_sql())
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }

    /// Inserts a product and its variants in one transaction.
    pub async fn create(&self, new: &NewProduct) -> DbResult<ProductDetail> {
        let id = generate_id();
        let now = Utc::now();
        let multiplier = new
            .custom_price_multiplier_bps
            .unwrap_or(DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS);

        debug!(id = %id, name = %new.name, "Creating product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_paise, original_price_paise,
                category, material, stock, is_customizable,
                custom_price_multiplier_bps, featured, images,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?13
            )
            "#,
        )
        .bind(&id)
        .bind(new.name.trim())
        .bind(new.description.as_deref())
        .bind(new.price_paise)
        .bind(new.original_price_paise)
        .bind(new.category.trim())
        .bind(new.material.as_deref())
        .bind(new.stock)
        .bind(new.is_customizable)
        .bind(i64::from(multiplier))
        .bind(new.featured)
        .bind(Json(&new.images))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for variant in &new.variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants (
                    id, product_id, size, color, fabric,
                    stock, price_adjustment_paise, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(generate_id())
            .bind(&id)
            .bind(variant.size.as_deref())
            .bind(variant.color.as_deref())
            .bind(variant.fabric.as_deref())
            .bind(variant.stock)
            .bind(variant.price_adjustment_paise)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %id, variants = new.variants.len(), "Product created");
        self.get_detail(&id).await
    }

    /// Applies a partial update. Absent fields keep their value.
    ///
    /// Every column is written as `COALESCE(?, column)`, so an update can
    /// change a nullable field but never clear it.
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        if update.is_empty() {
            return Err(DbError::InvalidInput("No fields to update".to_string()));
        }

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                price_paise = COALESCE(?3, price_paise),
                original_price_paise = COALESCE(?4, original_price_paise),
                category = COALESCE(?5, category),
                material = COALESCE(?6, material),
                stock = COALESCE(?7, stock),
                is_customizable = COALESCE(?8, is_customizable),
                custom_price_multiplier_bps = COALESCE(?9, custom_price_multiplier_bps),
                featured = COALESCE(?10, featured),
                images = COALESCE(?11, images),
                updated_at = ?12
            WHERE id = ?13 AND deleted_at IS NULL
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.price_paise)
        .bind(update.original_price_paise)
        .bind(update.category.as_deref().map(str::trim))
        .bind(update.material.as_deref())
        .bind(update.stock)
        .bind(update.is_customizable)
        .bind(update.custom_price_multiplier_bps.map(i64::from))
        .bind(update.featured)
        .bind(update.images.as_ref().map(Json))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product updated");
        self.get(id).await
    }

    /// Soft-deletes a product. Past orders keep referencing it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Records a 1–5 star review.
    pub async fn add_review(
        &self,
        user_id: &str,
        product_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, product_id, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(generate_id())
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(comment)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Variant attribute that can be listed as a filter.
#[derive(Debug, Clone, Copy)]
enum VariantColumn {
    Size,
    Color,
    Fabric,
}

impl VariantColumn {
    fn distinct_sql(self) -> &'static str {
        macro_rules! distinct {
            ($col:literal) => {
                concat!(
                    "SELECT DISTINCT v.",
                    $col,
                    " FROM product_variants v JOIN products p ON p.id = v.product_id",
                    " WHERE p.deleted_at IS NULL AND v.",
                    $col,
                    " IS NOT NULL ORDER BY v.",
                    $col
                )
            };
        }

        match self {
            VariantColumn::Size => distinct!("size"),
            VariantColumn::Color => distinct!("color"),
            VariantColumn::Fabric => distinct!("fabric"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use tailor_core::commands::NewVariant;

    fn variant(size: &str, color: &str) -> NewVariant {
        NewVariant {
            size: Some(size.to_string()),
            color: Some(color.to_string()),
            fabric: Some("Silk".to_string()),
            stock: 5,
            price_adjustment_paise: 0,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_detail() {
        let db = fixtures::db().await;
        let mut new = fixtures::product("Nehru Jacket", 350_000, 4);
        new.variants = vec![variant("M", "Navy"), variant("L", "Black")];
        new.custom_price_multiplier_bps = None;

        let detail = db.products().create(&new).await.unwrap();
        assert_eq!(detail.product.name, "Nehru Jacket");
        assert_eq!(detail.product.custom_price_multiplier_bps, 12_000);
        assert_eq!(detail.product.images.len(), 1);
        assert_eq!(detail.variants.len(), 2);
        assert_eq!(detail.review_count, 0);
        assert_eq!(detail.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let db = fixtures::db().await;
        let repo = db.products();

        let mut silk = fixtures::product("Silk Saree", 900_000, 3);
        silk.category = "Sarees".to_string();
        silk.variants = vec![variant("Free", "Red")];
        repo.create(&silk).await.unwrap();

        let mut kurta = fixtures::product("Linen Kurta", 150_000, 10);
        kurta.variants = vec![variant("M", "White")];
        kurta.featured = true;
        repo.create(&kurta).await.unwrap();

        repo.create(&fixtures::product("Cotton Kurta", 90_000, 10))
            .await
            .unwrap();

        let query = ProductQuery {
            sort: ProductSort::PriceLow,
            ..Default::default()
        };
        let (rows, total) = repo.list(&query, 20, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows[0].product.name, "Cotton Kurta");
        assert_eq!(rows[2].product.name, "Silk Saree");

        let query = ProductQuery {
            category: Some("kurtas".to_string()),
            color: Some("White".to_string()),
            ..Default::default()
        };
        let (rows, total) = repo.list(&query, 20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].product.name, "Linen Kurta");

        let query = ProductQuery {
            featured: Some(true),
            ..Default::default()
        };
        assert_eq!(repo.list(&query, 20, 0).await.unwrap().1, 1);

        let query = ProductQuery {
            max_price_paise: Some(200_000),
            ..Default::default()
        };
        let (_, total) = repo.list(&query, 1, 0).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = fixtures::db().await;
        fixtures::product_id(&db, "Bandhgala Suit", 1_200_000, 2).await;

        let hits = db.products().search("BANDH", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(db.products().search("sherwani", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_popular_sort_uses_rating() {
        let db = fixtures::db().await;
        let user = fixtures::customer(&db, "rater@example.com").await;
        let plain = fixtures::product_id(&db, "Plain Shirt", 80_000, 5).await;
        let loved = fixtures::product_id(&db, "Loved Shirt", 80_000, 5).await;

        db.products().add_review(&user, &loved, 5, Some("Perfect fit")).await.unwrap();
        db.products().add_review(&user, &plain, 2, None).await.unwrap();

        let query = ProductQuery {
            sort: ProductSort::Popular,
            ..Default::default()
        };
        let (rows, _) = db.products().list(&query, 20, 0).await.unwrap();
        assert_eq!(rows[0].product.id, loved);
        assert_eq!(rows[0].average_rating, 5.0);
        assert_eq!(rows[0].review_count, 1);
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let db = fixtures::db().await;
        let id = fixtures::product_id(&db, "Achkan", 500_000, 1).await;
        let repo = db.products();

        let update = ProductUpdate {
            price_paise: Some(450_000),
            featured: Some(true),
            ..Default::default()
        };
        let product = repo.update(&id, &update).await.unwrap();
        assert_eq!(product.price_paise, 450_000);
        assert!(product.featured);
        assert_eq!(product.name, "Achkan");

        let err = repo.update(&id, &ProductUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput(_)));

        repo.soft_delete(&id).await.unwrap();
        assert!(matches!(repo.get(&id).await, Err(DbError::NotFound { .. })));
        assert!(matches!(repo.soft_delete(&id).await, Err(DbError::NotFound { .. })));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_categories_and_filters() {
        let db = fixtures::db().await;
        let mut jacket = fixtures::product("Jacket", 300_000, 1);
        jacket.category = "Jackets".to_string();
        jacket.variants = vec![variant("XL", "Olive")];
        db.products().create(&jacket).await.unwrap();
        fixtures::product_id(&db, "Kurta One", 100_000, 1).await;
        fixtures::product_id(&db, "Kurta Two", 120_000, 1).await;

        let categories = db.products().categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name, "Kurtas");
        assert_eq!(categories[1].count, 2);

        let filters = db.products().filters().await.unwrap();
        assert_eq!(filters.sizes, vec!["XL".to_string()]);
        assert_eq!(filters.colors, vec!["Olive".to_string()]);
        assert_eq!(filters.fabrics, vec!["Silk".to_string()]);
        assert_eq!(filters.min_price_paise, 100_000);
        assert_eq!(filters.max_price_paise, 300_000);
    }
}
