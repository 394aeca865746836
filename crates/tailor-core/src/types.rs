//! # Domain Types
//!
//! Core domain types used throughout TailorCraft.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_paise    │   │  order_number   │   │  order_id (FK)  │       │
//! │  │  stock          │   │  subtotal/total │   │  method/status  │       │
//! │  │  multiplier_bps │   │  advance/due    │   │  amount_paise   │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1..n                                  │
//! │                        ┌────────▼────────┐                              │
//! │                        │   OrderItem     │  snapshot of price and      │
//! │                        │  ─────────────  │  multiplier at order time   │
//! │                        │  unit_price     │                              │
//! │                        │  customization  │                              │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PriceMultiplier │   │  OrderStatus    │   │ PaymentMethod   │       │
//! │  │  bps (u32)      │   │  pending → ...  │   │  cod/card/upi/  │       │
//! │  │  12000 = ×1.2   │   │  (5 values)     │   │  netbanking     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;
use crate::DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS;

// =============================================================================
// Price Multiplier
// =============================================================================

/// Custom-price multiplier in basis points.
///
/// 10000 bps = ×1.0, 12000 bps = ×1.2. Kept integral so that
/// `price × multiplier` stays exact until the subtotal is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceMultiplier(u32);

impl PriceMultiplier {
    /// ×1.0, used for lines that don't get the custom surcharge.
    pub const IDENTITY: PriceMultiplier = PriceMultiplier(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        PriceMultiplier(bps)
    }

    /// Creates a multiplier from a decimal factor (1.2 → 12000 bps).
    pub fn from_factor(factor: f64) -> Self {
        PriceMultiplier((factor * 10_000.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the factor (for display only).
    #[inline]
    pub fn factor(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    #[inline]
    pub const fn is_identity(&self) -> bool {
        self.0 == 10_000
    }
}

impl Default for PriceMultiplier {
    fn default() -> Self {
        PriceMultiplier(DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS)
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Worker => "worker",
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered account, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    pub description: Option<String>,

    /// Base price in paise.
    pub price_paise: i64,

    /// Pre-discount price shown struck through on the storefront.
    pub original_price_paise: Option<i64>,

    pub category: String,

    pub material: Option<String>,

    /// Units on hand. Never negative after a committed order.
    pub stock: i64,

    /// Whether buyers may attach measurements/size/colour/fabric.
    pub is_customizable: bool,

    /// Surcharge applied to customized lines, in basis points.
    pub custom_price_multiplier_bps: u32,

    pub featured: bool,

    /// Image URLs, first one is the thumbnail.
    pub images: Vec<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    #[inline]
    pub fn multiplier(&self) -> PriceMultiplier {
        PriceMultiplier::from_bps(self.custom_price_multiplier_bps)
    }

    /// First image, used as the order-line thumbnail.
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn in_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// A size/colour/fabric variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub fabric: Option<String>,
    pub stock: i64,
    /// Added to the base price when this variant is chosen.
    pub price_adjustment_paise: i64,
}

/// Product page payload: the product, its variants and review summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub average_rating: f64,
    pub review_count: i64,
}

/// Catalog list row: the product and its review summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub average_rating: f64,
    pub review_count: i64,
}

/// A category with its product count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategorySummary {
    pub name: String,
    pub count: i64,
}

/// Distinct filter values across the active catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogFilters {
    pub categories: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub fabrics: Vec<String>,
    pub min_price_paise: i64,
    pub max_price_paise: i64,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle state of an order.
///
/// ```text
/// pending ──► processing ──► shipped ──► delivered
///    │            │             │
///    └────────────┴─────────────┴──────► cancelled
/// ```
/// Only set membership is enforced; any listed value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders are finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Counted as "pending" in order stats.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::InvalidOrderStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method / Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Card,
    Upi,
    Netbanking,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cod,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::Netbanking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Netbanking => "netbanking",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "Cash on Delivery",
            PaymentMethod::Card => "Credit/Debit Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Netbanking => "Net Banking",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| crate::error::ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            })
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

// =============================================================================
// Shipping Address & Customization
// =============================================================================

/// Delivery address, stored as JSON on the order.
///
/// Keys are camelCase on the wire (`fullName`, `zipCode`) to match the
/// storefront checkout form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Buyer-supplied tailoring data attached to one line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,
    /// Free-form measurement values (`{"chest": 40, "sleeve": "24.5"}`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[ts(type = "Record<string, unknown>")]
    pub measurements: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Customization {
    /// True when nothing was actually chosen.
    pub fn is_empty(&self) -> bool {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |v| v.trim().is_empty())
        }

        blank(&self.size)
            && blank(&self.color)
            && blank(&self.fabric)
            && blank(&self.notes)
            && self.measurements.is_empty()
    }

    /// One-line summary for invoices and notifications (`Size: M, Color: Blue`).
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(size) = &self.size {
            parts.push(format!("Size: {size}"));
        }
        if let Some(color) = &self.color {
            parts.push(format!("Color: {color}"));
        }
        if let Some(fabric) = &self.fabric {
            parts.push(format!("Fabric: {fabric}"));
        }
        if !self.measurements.is_empty() {
            parts.push(format!("{} measurements", self.measurements.len()));
        }
        parts.join(", ")
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order header. Money fields are paise.
///
/// Invariants: `total = subtotal − discount`, `due = total − Σ completed payments`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Human-readable business key (`ORD-1718000000000-K3F9Q2ZLM`).
    pub order_number: String,
    pub subtotal_paise: i64,
    pub discount_paise: i64,
    pub total_paise: i64,
    pub advance_paise: i64,
    pub due_paise: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_paise(self.discount_paise)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    #[inline]
    pub fn advance(&self) -> Money {
        Money::from_paise(self.advance_paise)
    }

    #[inline]
    pub fn due(&self) -> Money {
        Money::from_paise(self.due_paise)
    }
}

/// A line of an order. Price and multiplier are frozen at order time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i64,
    /// Unit price after the multiplier, rounded to whole paise.
    pub unit_price_paise: i64,
    /// Multiplier that was applied (10000 when the line isn't customized).
    pub price_multiplier_bps: u32,
    pub customization: Option<Customization>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    /// Rounded unit price × quantity (display only).
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.quantity
    }
}

/// A payment towards an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount_paise: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway reference (`PAY-...`), absent for advances taken at checkout.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

/// Fully joined order: header, lines and payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

impl OrderDetail {
    /// Whether the per-line totals sum to the stored subtotal.
    ///
    /// Each [`OrderItem::line_total`] is a rounded unit price times the
    /// quantity, while the subtotal is rounded once from exact prices, so
    /// customized lines can be off by a few paise.
    pub fn line_totals_add_up(&self) -> bool {
        let lines: i128 = self
            .items
            .iter()
            .map(|item| item.unit_price_paise as i128 * item.quantity as i128)
            .sum();
        lines == self.order.subtotal_paise as i128
    }
}

/// Order header with its line count, for list views.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: i64,
}

/// Per-customer order aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStats {
    pub total_orders: i64,
    /// Pending or processing.
    pub pending_orders: i64,
    /// Delivered.
    pub completed_orders: i64,
    pub total_spent_paise: i64,
    pub due_balance_paise: i64,
}

// =============================================================================
// Measurements
// =============================================================================

/// Garment a measurement profile is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Shirt,
    Pant,
    Suit,
    Kurta,
    Blouse,
    Other,
}

/// A saved set of body measurements.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Measurement {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub name: String,
    #[ts(type = "Record<string, unknown>")]
    pub data: BTreeMap<String, serde_json::Value>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Wishlist
// =============================================================================

/// A wishlisted product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WishlistEntry {
    pub id: String,
    pub product: Product,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_multiplier() {
        let m = PriceMultiplier::from_factor(1.2);
        assert_eq!(m.bps(), 12_000);
        assert!((m.factor() - 1.2).abs() < 1e-9);
        assert_eq!(PriceMultiplier::default(), m);
        assert!(PriceMultiplier::IDENTITY.is_identity());
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!(matches!(
            "shipped!".parse::<OrderStatus>(),
            Err(CoreError::InvalidOrderStatus(s)) if s == "shipped!"
        ));
        assert!("Pending".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Processing.is_open());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("upi".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("paypal".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Cod.display_name(), "Cash on Delivery");
    }

    #[test]
    fn test_customization_is_empty() {
        assert!(Customization::default().is_empty());

        let blank = Customization {
            size: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.is_empty());

        let sized = Customization {
            size: Some("M".to_string()),
            ..Default::default()
        };
        assert!(!sized.is_empty());
        assert_eq!(sized.summary(), "Size: M");
    }

    #[test]
    fn test_shipping_address_camel_case() {
        let json = r#"{"fullName":"Asha Rao","address":"12 MG Road","city":"Pune","state":"MH","zipCode":"411001"}"#;
        let addr: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(addr.full_name, "Asha Rao");
        assert_eq!(addr.zip_code, "411001");
        assert!(addr.email.is_none());
    }

    #[test]
    fn test_measurement_type_field_name() {
        let json = serde_json::to_value(MeasurementType::Kurta).unwrap();
        assert_eq!(json, "kurta");
    }
}
