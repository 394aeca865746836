//! # Commands
//!
//! Input shapes for every mutation, plus catalog queries.
//!
//! Partial updates are explicit command types listing the mutable fields.
//! They use `deny_unknown_fields`, so a payload naming anything else is
//! rejected at deserialization instead of being silently ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Customization, MeasurementType, PaymentMethod, ShippingAddress};

// =============================================================================
// Orders
// =============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLineItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub customization: Option<Customization>,
}

/// A checkout request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub items: Vec<NewLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Caller-computed discount; recomputed from `coupon_code` when enforcement is on.
    #[serde(default)]
    pub discount_paise: i64,
    /// Paid at checkout; recorded as a completed payment when positive.
    #[serde(default)]
    pub advance_paise: i64,
}

impl NewOrder {
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_paise(self.discount_paise)
    }

    #[inline]
    pub fn advance(&self) -> Money {
        Money::from_paise(self.advance_paise)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A variant supplied with a new product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVariant {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub fabric: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub price_adjustment_paise: i64,
}

/// Admin request to add a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    #[serde(default)]
    pub original_price_paise: Option<i64>,
    pub category: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub is_customizable: bool,
    /// Defaults to ×1.2 when omitted.
    #[serde(default)]
    pub custom_price_multiplier_bps: Option<u32>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

/// Admin partial update of a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_paise: Option<i64>,
    pub original_price_paise: Option<i64>,
    pub category: Option<String>,
    pub material: Option<String>,
    pub stock: Option<i64>,
    pub is_customizable: Option<bool>,
    pub custom_price_multiplier_bps: Option<u32>,
    pub featured: Option<bool>,
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_paise.is_none()
            && self.original_price_paise.is_none()
            && self.category.is_none()
            && self.material.is_none()
            && self.stock.is_none()
            && self.is_customizable.is_none()
            && self.custom_price_multiplier_bps.is_none()
            && self.featured.is_none()
            && self.images.is_none()
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    /// Highest average rating first.
    Popular,
}

/// Catalog listing filters (query string of `GET /api/products`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price_paise: Option<i64>,
    pub max_price_paise: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub fabric: Option<String>,
    /// Case-insensitive match on name, description and category.
    pub search: Option<String>,
    pub is_customizable: Option<bool>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// =============================================================================
// Users
// =============================================================================

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

// =============================================================================
// Measurements
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMeasurement {
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub name: String,
    #[ts(type = "Record<string, unknown>")]
    pub data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct MeasurementUpdate {
    #[serde(rename = "type")]
    pub measurement_type: Option<MeasurementType>,
    pub name: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub data: Option<BTreeMap<String, serde_json::Value>>,
}

impl MeasurementUpdate {
    pub fn is_empty(&self) -> bool {
        self.measurement_type.is_none() && self.name.is_none() && self.data.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
