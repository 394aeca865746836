//! # Payment Repository
//!
//! The mock payment gateway: a payment is initiated as `pending` with a
//! `PAY-...` reference and approved on verification.
//!
//! ```text
//! initiate() ──► payments(status = pending, reference = PAY-...)
//!                        │
//! verify(reference) ─────┤  pending   → completed, order.due -= amount (one tx)
//!                        │  completed → returned unchanged
//!                        └  unknown   → NotFound
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::order::{PaymentRow, PAYMENT_COLUMNS};
use crate::repository::{generate_id, generate_reference};
use tailor_core::money::Money;
use tailor_core::{Payment, PaymentMethod, PaymentStatus, PAYMENT_REFERENCE_PREFIX};

/// Repository for gateway payments.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Opens a pending payment against an order owned by `owner`.
    pub async fn initiate(
        &self,
        order_id: &str,
        amount: Money,
        method: PaymentMethod,
        owner: &str,
    ) -> DbResult<Payment> {
        if !amount.is_positive() {
            return Err(DbError::InvalidInput("Payment amount must be positive".to_string()));
        }

        let owned: Option<String> =
            sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1 AND user_id = ?2")
                .bind(order_id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;

        if owned.is_none() {
            return Err(DbError::not_found("Order", order_id));
        }

        let id = generate_id();
        let reference = generate_reference(PAYMENT_REFERENCE_PREFIX);

        debug!(order_id = %order_id, reference = %reference, amount = %amount, "Initiating payment");

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_paise, method, status, reference, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(order_id)
        .bind(amount.paise())
        .bind(method)
        .bind(PaymentStatus::Pending)
        .bind(&reference)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(&id).await
    }

    /// Approves a pending payment and lowers the order's due, atomically.
    ///
    /// Verifying a completed payment again changes nothing. With `owner`,
    /// payments on other users' orders are `NotFound`.
    pub async fn verify(&self, reference: &str, owner: Option<&str>) -> DbResult<Payment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let approved: Option<(String, String, i64)> = sqlx::query_as(
            r#"
            UPDATE payments SET status = ?1, completed_at = ?2
            WHERE reference = ?3
              AND status = ?4
              AND (?5 IS NULL OR order_id IN (SELECT id FROM orders WHERE user_id = ?5))
            RETURNING id, order_id, amount_paise
            "#,
        )
        .bind(PaymentStatus::Completed)
        .bind(now)
        .bind(reference)
        .bind(PaymentStatus::Pending)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id, order_id, amount_paise)) = approved else {
            tx.rollback().await?;
            return self.already_settled(reference, owner).await;
        };

        sqlx::query(
            r#"
            UPDATE orders SET
                due_paise = due_paise - ?1,
                advance_paise = advance_paise + ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(amount_paise)
        .bind(now)
        .bind(&order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(reference = %reference, order_id = %order_id, amount_paise, "Payment verified");
        self.get(&id).await
    }

    /// Result of verifying a reference that had nothing pending.
    async fn already_settled(&self, reference: &str, owner: Option<&str>) -> DbResult<Payment> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE reference = ?1
              AND (?2 IS NULL OR order_id IN (SELECT id FROM orders WHERE user_id = ?2))
            "#
        ))
        .bind(reference)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        let payment: Payment = row
            .map(Into::into)
            .ok_or_else(|| DbError::not_found("Payment", reference))?;

        debug!(reference = %reference, status = ?payment.status, "Payment already settled");
        Ok(payment)
    }

    /// Gets a payment by ID.
    pub async fn get(&self, id: &str) -> DbResult<Payment> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Into::into).ok_or_else(|| DbError::not_found("Payment", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use tailor_core::commands::NewLineItem;
    use tailor_core::coupon::DiscountPolicy;

    async fn placed_order(db: &crate::Database, buyer: &str) -> String {
        let product = fixtures::product_id(db, "Waistcoat", 100_000, 3).await;
        let order = fixtures::order(vec![NewLineItem {
            product_id: product,
            quantity: 1,
            customization: None,
        }]);
        db.orders()
            .create(buyer, &order, DiscountPolicy::Enforce)
            .await
            .unwrap()
            .order
            .id
    }

    #[tokio::test]
    async fn test_initiate_then_verify() {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "gw@example.com").await;
        let order_id = placed_order(&db, &buyer).await;
        let payments = db.payments();

        let pending = payments
            .initiate(&order_id, Money::from_paise(40_000), PaymentMethod::Card, &buyer)
            .await
            .unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);
        let reference = pending.reference.clone().unwrap();
        assert!(reference.starts_with("PAY-"));

        // a pending payment does not touch the due
        let order = db.orders().find(&order_id, None).await.unwrap().order;
        assert_eq!(order.due_paise, 100_000);

        let done = payments.verify(&reference, Some(&buyer)).await.unwrap();
        assert_eq!(done.status, PaymentStatus::Completed);
        assert!(done.completed_at.is_some());

        let order = db.orders().find(&order_id, None).await.unwrap().order;
        assert_eq!(order.due_paise, 60_000);
        assert_eq!(order.advance_paise, 40_000);

        // second verification is a no-op
        let again = payments.verify(&reference, None).await.unwrap();
        assert_eq!(again.id, done.id);
        let order = db.orders().find(&order_id, None).await.unwrap().order;
        assert_eq!(order.due_paise, 60_000);
    }

    #[tokio::test]
    async fn test_unknown_and_foreign() {
        let db = fixtures::db().await;
        let buyer = fixtures::customer(&db, "gw2@example.com").await;
        let other = fixtures::customer(&db, "gw3@example.com").await;
        let order_id = placed_order(&db, &buyer).await;
        let payments = db.payments();

        let missing = payments.verify("PAY-0-NOTHING", None).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));

        let foreign = payments
            .initiate(&order_id, Money::from_paise(100), PaymentMethod::Upi, &other)
            .await;
        assert!(matches!(foreign, Err(DbError::NotFound { .. })));

        let pending = payments
            .initiate(&order_id, Money::from_paise(100), PaymentMethod::Upi, &buyer)
            .await
            .unwrap();
        let reference = pending.reference.unwrap();
        let stolen = payments.verify(&reference, Some(&other)).await;
        assert!(matches!(stolen, Err(DbError::NotFound { .. })));
    }
}
