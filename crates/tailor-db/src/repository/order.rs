//! # Order Repository
//!
//! The order engine: pricing a cart, persisting it atomically, taking
//! payments against it and moving it through its status values.
//!
//! ## Order Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create()                                          │
//! │                                                                         │
//! │  1. PRICE (no transaction yet)                                          │
//! │     └── read each product → price_line() → subtotal_of()                │
//! │     └── resolve_discount() → quote_order()                              │
//! │                                                                         │
//! │  2. PERSIST (one transaction, first statement is a write)               │
//! │     └── INSERT orders                                                   │
//! │     └── INSERT order_items (name, unit price, multiplier snapshot)      │
//! │     └── UPDATE products SET stock = stock - q                           │
//! │            WHERE id = ? AND stock >= q        ← the only stock guard    │
//! │            (0 rows → InsufficientStock, whole order rolled back)        │
//! │     └── INSERT payments (completed) when advance > 0                    │
//! │     └── COMMIT                                                          │
//! │                                                                         │
//! │  3. RE-READ the joined order                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A dropped `Transaction` rolls back, so every `?` inside step 2 leaves no
//! trace of the order.

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, generate_reference};
use tailor_core::commands::NewOrder;
use tailor_core::coupon::{resolve_discount, DiscountPolicy};
use tailor_core::money::Money;
use tailor_core::pricing::{price_line, quote_order, subtotal_of, CatalogPrice, PricedLine};
use tailor_core::{
    CoreResult, Customization, Order, OrderDetail, OrderItem, OrderStats, OrderStatus,
    OrderSummary, Payment, PaymentMethod, PaymentStatus, PriceMultiplier, ShippingAddress,
    ORDER_NUMBER_PREFIX,
};

/// Days until delivery for ready-made orders.
const STANDARD_DELIVERY_DAYS: i64 = 7;

/// Days until delivery when any line is tailored.
const CUSTOM_DELIVERY_DAYS: i64 = 14;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: String,
    name: String,
    price_paise: i64,
    is_customizable: bool,
    custom_price_multiplier_bps: i64,
}

impl CatalogRow {
    fn catalog_price(&self) -> CatalogPrice {
        CatalogPrice {
            product_id: self.id.clone(),
            price: Money::from_paise(self.price_paise),
            is_customizable: self.is_customizable,
            multiplier: PriceMultiplier::from_bps(
                u32::try_from(self.custom_price_multiplier_bps)
                    .unwrap_or(PriceMultiplier::IDENTITY.bps()),
            ),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    order_number: String,
    subtotal_paise: i64,
    discount_paise: i64,
    total_paise: i64,
    advance_paise: i64,
    due_paise: i64,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    notes: Option<String>,
    coupon_code: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            user_id: row.user_id,
            order_number: row.order_number,
            subtotal_paise: row.subtotal_paise,
            discount_paise: row.discount_paise,
            total_paise: row.total_paise,
            advance_paise: row.advance_paise,
            due_paise: row.due_paise,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            status: row.status,
            notes: row.notes,
            coupon_code: row.coupon_code,
            estimated_delivery: row.estimated_delivery,
            tracking_number: row.tracking_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    item_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    product_image: Option<String>,
    quantity: i64,
    unit_price_paise: i64,
    price_multiplier_bps: i64,
    customization: Option<Json<Customization>>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_image: row.product_image,
            quantity: row.quantity,
            unit_price_paise: row.unit_price_paise,
            price_multiplier_bps: u32::try_from(row.price_multiplier_bps)
                .unwrap_or(PriceMultiplier::IDENTITY.bps()),
            customization: row.customization.map(|c| c.0),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PaymentRow {
    id: String,
    order_id: String,
    amount_paise: i64,
    method: PaymentMethod,
    status: PaymentStatus,
    reference: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            order_id: row.order_id,
            amount_paise: row.amount_paise,
            method: row.method,
            status: row.status,
            reference: row.reference,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_orders: i64,
    pending_orders: i64,
    completed_orders: i64,
    total_spent_paise: i64,
    due_balance_paise: i64,
}

pub(crate) const PAYMENT_COLUMNS: &str =
    "id, order_id, amount_paise, method, status, reference, created_at, completed_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders, order items and order-side payments.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Prices and persists a new order for `user_id`, all or nothing.
    ///
    /// The cart is assumed to have passed `validate_new_order`.
    ///
    /// ## Errors
    /// - a product missing or deleted → `NotFound` (nothing written)
    /// - unknown coupon, a discount above the subtotal or an amount beyond
    ///   i64 paise → `InvalidInput`
    /// - not enough stock for a ready-made line → `InsufficientStock`
    pub async fn create(
        &self,
        user_id: &str,
        order: &NewOrder,
        policy: DiscountPolicy,
    ) -> DbResult<OrderDetail> {
        if order.items.is_empty() {
            return Err(DbError::InvalidInput("Order must contain at least one item".to_string()));
        }

        // 1. Price against the current catalog
        let catalog = self.catalog_for(order).await?;

        let lines = order
            .items
            .iter()
            .map(|item| {
                let product = &catalog[item.product_id.as_str()];
                price_line(&product.catalog_price(), item.quantity, item.customization.clone())
            })
            .collect::<CoreResult<Vec<PricedLine>>>()?;

        let coupon_code = order
            .coupon_code
            .as_deref()
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty());

        let subtotal = subtotal_of(&lines)?;
        let discount = resolve_discount(policy, coupon_code.as_deref(), order.discount(), subtotal)?;
        let quote = quote_order(lines, discount, order.advance())?;

        let id = generate_id();
        let order_number = generate_reference(ORDER_NUMBER_PREFIX);
        let now = Utc::now();
        let delivery_days = if quote.lines.iter().any(PricedLine::is_customized) {
            CUSTOM_DELIVERY_DAYS
        } else {
            STANDARD_DELIVERY_DAYS
        };

        debug!(
            id = %id,
            order_number = %order_number,
            subtotal = %quote.subtotal,
            total = %quote.total,
            "Creating order"
        );

        // 2. Persist
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, order_number,
                subtotal_paise, discount_paise, total_paise, advance_paise, due_paise,
                shipping_address, payment_method, status, notes, coupon_code,
                estimated_delivery, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?15
            )
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&order_number)
        .bind(quote.subtotal.paise())
        .bind(quote.discount.paise())
        .bind(quote.total.paise())
        .bind(quote.advance.paise())
        .bind(quote.due.paise())
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method)
        .bind(OrderStatus::Pending)
        .bind(order.notes.as_deref())
        .bind(coupon_code.as_deref())
        .bind(now + Duration::days(delivery_days))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &quote.lines {
            let product_name = &catalog[line.product_id.as_str()].name;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name,
                    quantity, unit_price_paise, price_multiplier_bps,
                    customization, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(generate_id())
            .bind(&id)
            .bind(&line.product_id)
            .bind(product_name)
            .bind(line.quantity)
            .bind(line.unit_price.paise())
            .bind(i64::from(line.multiplier.bps()))
            .bind(line.customization.as_ref().map(Json))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for (product_id, quantity) in quote.stock_draws() {
            draw_stock(&mut *tx, product_id, quantity, now).await?;
        }

        if quote.advance.is_positive() {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    id, order_id, amount_paise, method, status, created_at, completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                "#,
            )
            .bind(generate_id())
            .bind(&id)
            .bind(quote.advance.paise())
            .bind(order.payment_method)
            .bind(PaymentStatus::Completed)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %id,
            order_number = %order_number,
            lines = quote.lines.len(),
            total = %quote.total,
            "Order created"
        );

        // 3. Re-read
        self.find(&id, Some(user_id)).await
    }

    /// Loads the pricing facts of every product the cart references.
    async fn catalog_for(&self, order: &NewOrder) -> DbResult<HashMap<String, CatalogRow>> {
        let mut catalog = HashMap::with_capacity(order.items.len());

        for item in &order.items {
            if catalog.contains_key(&item.product_id) {
                continue;
            }

            let row: Option<CatalogRow> = sqlx::query_as(
                r#"
                SELECT id, name, price_paise, is_customizable, custom_price_multiplier_bps
                FROM products
                WHERE id = ?1 AND deleted_at IS NULL
                "#,
            )
            .bind(&item.product_id)
            .fetch_optional(&self.pool)
            .await?;

            let row = row.ok_or_else(|| DbError::not_found("Product", &item.product_id))?;
            catalog.insert(item.product_id.clone(), row);
        }

        Ok(catalog)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Gets the joined order. With `owner`, another user's order is `NotFound`.
    pub async fn find(&self, id: &str, owner: Option<&str>) -> DbResult<OrderDetail> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT * FROM orders WHERE id = ?1 AND (?2 IS NULL OR user_id = ?2)",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        let order: Order = row
            .map(Into::into)
            .ok_or_else(|| DbError::not_found("Order", id))?;

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.product_name,
                   json_extract(p.images, '$[0]') AS product_image,
                   oi.quantity, oi.unit_price_paise, oi.price_multiplier_bps,
                   oi.customization, oi.created_at
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ?1
            ORDER BY oi.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let payments = self.payments(id).await?;

        Ok(OrderDetail {
            order,
            items: items.into_iter().map(Into::into).collect(),
            payments,
        })
    }

    /// Payments recorded against an order, oldest first.
    pub async fn payments(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Orders of one user (or of everyone when `user_id` is `None`), newest
    /// first, optionally filtered by status.
    pub async fn list(
        &self,
        user_id: Option<&str>,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<OrderSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT o.*, COUNT(oi.id) AS item_count
            FROM orders o
            LEFT JOIN order_items oi ON oi.order_id = o.id
            WHERE (?1 IS NULL OR o.user_id = ?1)
              AND (?2 IS NULL OR o.status = ?2)
            GROUP BY o.id
            ORDER BY o.created_at DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderSummary {
                order: row.order.into(),
                item_count: row.item_count,
            })
            .collect())
    }

    /// Aggregates over all of a user's orders.
    pub async fn stats(&self, user_id: &str) -> DbResult<OrderStats> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COALESCE(SUM(CASE WHEN status IN ('pending', 'processing') THEN 1 ELSE 0 END), 0)
                    AS pending_orders,
                COALESCE(SUM(CASE WHEN status = 'delivered' THEN 1 ELSE 0 END), 0)
                    AS completed_orders,
                COALESCE(SUM(total_paise), 0) AS total_spent_paise,
                COALESCE(SUM(due_paise), 0) AS due_balance_paise
            FROM orders
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderStats {
            total_orders: row.total_orders,
            pending_orders: row.pending_orders,
            completed_orders: row.completed_orders,
            total_spent_paise: row.total_spent_paise,
            due_balance_paise: row.due_balance_paise,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Records a completed payment and lowers the order's due by `amount`.
    ///
    /// With `owner`, only that user's order matches. The advance grows by the
    /// same amount, so `due = total − advance` keeps holding. Nothing caps the
    /// cumulative amount: due may go negative.
    ///
    /// ## Errors
    /// - `amount <= 0` → `InvalidInput`
    /// - no matching order → `NotFound` (no payment row written)
    pub async fn add_payment(
        &self,
        order_id: &str,
        amount: Money,
        method: PaymentMethod,
        owner: Option<&str>,
    ) -> DbResult<(Payment, Order)> {
        if !amount.is_positive() {
            return Err(DbError::InvalidInput("Payment amount must be positive".to_string()));
        }

        let now = Utc::now();
        let payment_id = generate_id();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                due_paise = due_paise - ?1,
                advance_paise = advance_paise + ?1,
                updated_at = ?2
            WHERE id = ?3 AND (?4 IS NULL OR user_id = ?4)
            "#,
        )
        .bind(amount.paise())
        .bind(now)
        .bind(order_id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, amount_paise, method, status, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&payment_id)
        .bind(order_id)
        .bind(amount.paise())
        .bind(method)
        .bind(PaymentStatus::Completed)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let payment: PaymentRow = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
        ))
        .bind(&payment_id)
        .fetch_one(&mut *tx)
        .await?;

        let order: OrderRow = sqlx::query_as("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let order: Order = order.into();
        if order.due().is_negative() {
            warn!(id = %order_id, due = %order.due(), "Order overpaid");
        }
        info!(id = %order_id, amount = %amount, due = %order.due(), "Payment added");

        Ok((payment.into(), order))
    }

    /// Sets an order's status.
    ///
    /// The value is parsed before anything is written, so an unknown status
    /// leaves the order untouched. With `owner`, only that user's order
    /// matches; a foreign order is indistinguishable from a missing one.
    ///
    /// Cancelling does not return stock.
    pub async fn update_status(
        &self,
        order_id: &str,
        status: &str,
        owner: Option<&str>,
    ) -> DbResult<Order> {
        let status: OrderStatus = status.parse()?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND (?4 IS NULL OR user_id = ?4)
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(order_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        info!(id = %order_id, status = %status, "Order status updated");

        let row: OrderRow = sqlx::query_as("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}

/// Conditionally decrements stock inside the order transaction.
async fn draw_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND stock >= ?1 AND deleted_at IS NULL
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        warn!(product_id = %product_id, requested = quantity, "Insufficient stock");

        return Err(DbError::InsufficientStock {
            product_id: product_id.to_string(),
            available: available.unwrap_or(0),
            requested: quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::{Database, DbConfig};
    use tailor_core::commands::NewLineItem;

    fn line(product_id: &str, quantity: i64, customization: Option<Customization>) -> NewLineItem {
        NewLineItem {
            product_id: product_id.to_string(),
            quantity,
            customization,
        }
    }

    fn size_m() -> Option<Customization> {
        Some(Customization {
            size: Some("M".to_string()),
            ..Default::default()
        })
    }

    /// Product {price ₹2000, customizable, ×1.2, stock 5} and a buyer.
    async fn setup() -> (Database, String, String) {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "buyer@example.com").await;
        let product = fixtures::product_id(&db, "Sherwani", 200_000, 5).await;
        (db, buyer, product)
    }

    async fn stock_of(db: &Database, product_id: &str) -> i64 {
        db.products().get(product_id).await.unwrap().stock
    }

    async fn order_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_line_decrements_stock() {
        let (db, buyer, product) = setup().await;

        let order = fixtures::order(vec![line(&product, 2, None)]);
        let detail = db
            .orders()
            .create(&buyer, &order, DiscountPolicy::Enforce)
            .await
            .unwrap();

        assert_eq!(detail.order.subtotal_paise, 400_000);
        assert_eq!(detail.order.total_paise, 400_000);
        assert_eq!(detail.order.due_paise, 400_000);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert!(detail.order.order_number.starts_with("ORD-"));
        assert_eq!(stock_of(&db, &product).await, 3);

        let item = &detail.items[0];
        assert_eq!(item.product_name, "Sherwani");
        assert_eq!(item.unit_price_paise, 200_000);
        assert_eq!(item.price_multiplier_bps, 10_000);
        assert_eq!(item.product_image.as_deref(), Some("https://img.example/Sherwani.jpg"));
        assert!(detail.payments.is_empty());
    }

    #[tokio::test]
    async fn test_customized_line_uses_multiplier_and_keeps_stock() {
        let (db, buyer, product) = setup().await;

        let order = fixtures::order(vec![line(&product, 1, size_m())]);
        let detail = db
            .orders()
            .create(&buyer, &order, DiscountPolicy::Enforce)
            .await
            .unwrap();

        assert_eq!(detail.items[0].unit_price_paise, 240_000);
        assert_eq!(detail.items[0].price_multiplier_bps, 12_000);
        assert_eq!(detail.items[0].customization, size_m());
        assert_eq!(detail.order.subtotal_paise, 240_000);
        assert_eq!(stock_of(&db, &product).await, 5);
    }

    #[tokio::test]
    async fn test_snapshot_price_survives_catalog_change() {
        let (db, buyer, product) = setup().await;
        let order = fixtures::order(vec![line(&product, 1, None)]);
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();

        let update = tailor_core::commands::ProductUpdate {
            price_paise: Some(999_900),
            ..Default::default()
        };
        db.products().update(&product, &update).await.unwrap();

        let reread = db.orders().find(&detail.order.id, Some(&buyer)).await.unwrap();
        assert_eq!(reread.items[0].unit_price_paise, 200_000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, buyer, product) = setup().await;

        let mut order = fixtures::order(vec![line(&product, 6, None)]);
        order.advance_paise = 10_000;
        let err = db
            .orders()
            .create(&buyer, &order, DiscountPolicy::Enforce)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::InsufficientStock { available: 5, requested: 6, .. }
        ));
        assert_eq!(stock_of(&db, &product).await, 5);
        assert_eq!(order_count(&db).await, 0);

        let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(payments, 0);
    }

    #[tokio::test]
    async fn test_second_line_failure_rolls_back_first() {
        let (db, buyer, product) = setup().await;
        let scarce = fixtures::product_id(&db, "Dupatta", 50_000, 1).await;

        let order = fixtures::order(vec![line(&product, 2, None), line(&scarce, 2, None)]);
        let err = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await;

        assert!(matches!(err, Err(DbError::InsufficientStock { .. })));
        assert_eq!(stock_of(&db, &product).await, 5);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let (db, buyer, product) = setup().await;

        let order = fixtures::order(vec![line(&product, 1, None), line("missing", 1, None)]);
        let err = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await;

        assert!(matches!(err, Err(DbError::NotFound { ref entity, .. }) if entity == "Product"));
        assert_eq!(stock_of(&db, &product).await, 5);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_oversized_subtotal_is_rejected() {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "whale@example.com").await;
        let product = fixtures::product_id(&db, "Gold Sherwani", 4_000_000_000_000_000_000, 5).await;

        let order = fixtures::order(vec![line(&product, 3, None)]);
        let err = db
            .orders()
            .create(&buyer, &order, DiscountPolicy::Enforce)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::InvalidInput(ref msg) if msg == "Amount is too large"));
        assert_eq!(stock_of(&db, &product).await, 5);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_orders_for_last_unit() {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "racer@example.com").await;
        let product = fixtures::product_id(&db, "Last Kurta", 100_000, 1).await;

        let order = fixtures::order(vec![line(&product, 1, None)]);
        let (first, second) = (db.orders(), db.orders());
        let (a, b) = tokio::join!(
            first.create(&buyer, &order, DiscountPolicy::Enforce),
            second.create(&buyer, &order, DiscountPolicy::Enforce),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(e) if e.is_conflict()))
                .count(),
            1
        );
        assert_eq!(stock_of(&db, &product).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_connections_sell_last_unit_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        let buyer = fixtures::customer(&db, "crowd@example.com").await;
        let product = fixtures::product_id(&db, "Last Sherwani", 150_000, 1).await;
        let order = fixtures::order(vec![line(&product, 1, None)]);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let buyer = buyer.clone();
                let order = order.clone();
                tokio::spawn(async move {
                    db.orders()
                        .create(&buyer, &order, DiscountPolicy::Enforce)
                        .await
                })
            })
            .collect();

        let mut placed = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => placed += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(placed, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(stock_of(&db, &product).await, 0);
        assert_eq!(order_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_advance_records_completed_payment() {
        let (db, buyer, product) = setup().await;

        let mut order = fixtures::order(vec![line(&product, 1, None)]);
        order.advance_paise = 50_000;
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();

        assert_eq!(detail.order.advance_paise, 50_000);
        assert_eq!(detail.order.due_paise, 150_000);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].status, PaymentStatus::Completed);
        assert_eq!(detail.payments[0].amount_paise, 50_000);
    }

    #[tokio::test]
    async fn test_enforced_coupon_recomputes_discount() {
        let (db, buyer, product) = setup().await;

        let mut order = fixtures::order(vec![line(&product, 1, None)]);
        order.coupon_code = Some("save20".to_string());
        order.discount_paise = 150_000;
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();

        assert_eq!(detail.order.discount_paise, 40_000);
        assert_eq!(detail.order.total_paise, 160_000);
        assert_eq!(detail.order.coupon_code.as_deref(), Some("SAVE20"));

        order.coupon_code = Some("NOPE".to_string());
        let err = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await;
        assert!(matches!(err, Err(DbError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_trusted_discount_over_subtotal_rejected() {
        let (db, buyer, product) = setup().await;

        let mut order = fixtures::order(vec![line(&product, 1, None)]);
        order.discount_paise = 150_000;
        let detail = db
            .orders()
            .create(&buyer, &order, DiscountPolicy::TrustCaller)
            .await
            .unwrap();
        assert_eq!(detail.order.total_paise, 50_000);

        order.discount_paise = 200_001;
        let err = db.orders().create(&buyer, &order, DiscountPolicy::TrustCaller).await;
        assert!(matches!(err, Err(DbError::InvalidInput(_))));
        assert_eq!(stock_of(&db, &product).await, 4);
    }

    #[tokio::test]
    async fn test_two_payments_settle_order() {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "payer@example.com").await;
        let product = fixtures::product_id(&db, "Pocket Square", 1_000, 10).await;
        let order = fixtures::order(vec![line(&product, 1, None)]);
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();
        let orders = db.orders();

        let money = Money::from_paise(500);
        orders.add_payment(&detail.order.id, money, PaymentMethod::Upi, Some(&buyer)).await.unwrap();
        let (payment, updated) = orders
            .add_payment(&detail.order.id, money, PaymentMethod::Upi, Some(&buyer))
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(updated.due().is_zero());
        assert_eq!(updated.advance_paise, 1_000);
        assert_eq!(orders.payments(&detail.order.id).await.unwrap().len(), 2);

        // overpayment is tracked, not refused
        let (_, overpaid) = orders
            .add_payment(&detail.order.id, money, PaymentMethod::Cod, None)
            .await
            .unwrap();
        assert_eq!(overpaid.due_paise, -500);
    }

    #[tokio::test]
    async fn test_add_payment_missing_or_foreign_order() {
        let (db, buyer, product) = setup().await;
        let other = fixtures::customer(&db, "other@example.com").await;
        let order = fixtures::order(vec![line(&product, 1, None)]);
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();
        let amount = Money::from_paise(100);

        let missing = db.orders().add_payment("nope", amount, PaymentMethod::Card, None).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));

        let foreign = db
            .orders()
            .add_payment(&detail.order.id, amount, PaymentMethod::Card, Some(&other))
            .await;
        assert!(matches!(foreign, Err(DbError::NotFound { .. })));

        let zero = db
            .orders()
            .add_payment(&detail.order.id, Money::zero(), PaymentMethod::Card, None)
            .await;
        assert!(matches!(zero, Err(DbError::InvalidInput(_))));

        assert!(db.orders().payments(&detail.order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status() {
        let (db, buyer, product) = setup().await;
        let other = fixtures::customer(&db, "other@example.com").await;
        let order = fixtures::order(vec![line(&product, 1, None)]);
        let detail = db.orders().create(&buyer, &order, DiscountPolicy::Enforce).await.unwrap();
        let id = detail.order.id.as_str();

        let err = db.orders().update_status(id, "shipped!", None).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput(_)));
        let unchanged = db.orders().find(id, None).await.unwrap();
        assert_eq!(unchanged.order.status, OrderStatus::Pending);

        let foreign = db.orders().update_status(id, "cancelled", Some(&other)).await;
        assert!(matches!(foreign, Err(DbError::NotFound { .. })));

        let cancelled = db.orders().update_status(id, "cancelled", Some(&buyer)).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        // cancellation keeps the stock drawn
        assert_eq!(stock_of(&db, &product).await, 4);

        let shipped = db.orders().update_status(id, "shipped", None).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let (db, buyer, product) = setup().await;
        let orders = db.orders();

        let first = orders
            .create(&buyer, &fixtures::order(vec![line(&product, 1, None)]), DiscountPolicy::Enforce)
            .await
            .unwrap();
        orders
            .create(
                &buyer,
                &fixtures::order(vec![line(&product, 1, None), line(&product, 1, size_m())]),
                DiscountPolicy::Enforce,
            )
            .await
            .unwrap();
        orders.update_status(&first.order.id, "delivered", None).await.unwrap();

        let all = orders.list(Some(&buyer), None, 20, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().map(|o| o.item_count).sum::<i64>(), 3);

        let delivered = orders
            .list(Some(&buyer), Some(OrderStatus::Delivered), 20, 0)
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);

        let stats = orders.stats(&buyer).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.completed_orders, 1);
        assert_eq!(stats.total_spent_paise, 200_000 + 440_000);
        assert_eq!(stats.due_balance_paise, 640_000);

        let nobody = orders.stats("nobody").await.unwrap();
        assert_eq!(nobody, OrderStats::default());
    }
}
