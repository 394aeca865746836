//! # tailor-core: Pure Business Logic for TailorCraft
//!
//! Everything that decides *what an order costs* lives here, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      TailorCraft Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront (SPA)                             │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Dashboard / Invoice        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tailor-api (axum)                            │   │
//! │  │    JWT guard, validation, handlers, notifications, invoices     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tailor-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  money   │ │ pricing  │ │validation│          │   │
//! │  │   │  Order   │ │  Money   │ │  quote   │ │  rules   │          │   │
//! │  │   │ Product  │ │          │ │  coupon  │ │          │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tailor-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, order transaction            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Order, Payment, Measurement, ...)
//! - [`commands`] - Input commands (NewOrder, ProductUpdate, ...)
//! - [`money`] - Money type with integer arithmetic (paise, no floats)
//! - [`pricing`] - Line pricing and order quotes
//! - [`coupon`] - The fixed coupon table
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tailor_core::money::Money;
//! use tailor_core::pricing::{price_line, quote_order, CatalogPrice};
//! use tailor_core::types::{Customization, PriceMultiplier};
//!
//! let kurta = CatalogPrice {
//!     product_id: "p-1".to_string(),
//!     price: Money::from_paise(100_000), // ₹1000.00
//!     is_customizable: true,
//!     multiplier: PriceMultiplier::from_bps(12_000), // ×1.2
//! };
//!
//! let custom = Customization { size: Some("M".into()), ..Default::default() };
//! let line = price_line(&kurta, 1, Some(custom)).unwrap();
//! let quote = quote_order(vec![line], Money::zero(), Money::zero()).unwrap();
//!
//! assert_eq!(quote.subtotal.paise(), 120_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commands;
pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items accepted in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against typos like 1000 instead of 10 at checkout.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest catalog price, in paise (₹1 crore).
///
/// Keeps `price × multiplier × quantity` for a full cart well inside i64.
pub const MAX_PRICE_PAISE: i64 = 1_000_000_000;

/// Multiplier applied to customized lines when a product doesn't set one (×1.2).
pub const DEFAULT_CUSTOM_PRICE_MULTIPLIER_BPS: u32 = 12_000;

/// Prefix of every human-readable order number (`ORD-<millis>-<SUFFIX>`).
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Prefix of every mock-gateway payment reference (`PAY-<millis>-<SUFFIX>`).
pub const PAYMENT_REFERENCE_PREFIX: &str = "PAY";

/// Page size when a list request doesn't give one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum page size for list endpoints.
pub const MAX_PAGE_LIMIT: i64 = 100;
