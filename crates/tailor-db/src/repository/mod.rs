//! # Repository Module
//!
//! Database repository implementations for TailorCraft.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.orders().create(&user_id, &new_order, policy)               │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── create(&self, user_id, order, policy)    ← the order engine        │
//! │  ├── add_payment(&self, order_id, amount, ..)                           │
//! │  ├── update_status(&self, order_id, status, owner)                      │
//! │  └── stats(&self, user_id)                                              │
//! │       │                                                                 │
//! │       │  SQL (runtime query_as + FromRow rows)                          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog queries and admin CRUD
//! - [`OrderRepository`](order::OrderRepository) - Order engine, payments on orders, stats
//! - [`PaymentRepository`](payment::PaymentRepository) - Mock gateway initiate/verify
//! - [`UserRepository`](user::UserRepository) - Accounts, credentials, reset tokens
//! - [`MeasurementRepository`](measurement::MeasurementRepository) - Saved measurements
//! - [`WishlistRepository`](wishlist::WishlistRepository) - Wishlist entries

pub mod measurement;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;
pub mod wishlist;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Length of the random part of order numbers and payment references.
const REFERENCE_SUFFIX_LEN: usize = 9;

/// Generates a business reference: `<PREFIX>-<unix millis>-<9 chars A-Z0-9>`.
///
/// ## Example
/// `ORD-1718000000000-K3F9Q2ZLM`
///
/// Uniqueness is enforced by the UNIQUE column the value is stored in.
pub fn generate_reference(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();

    format!("{prefix}-{millis}-{suffix}")
}

/// Generates a new row ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Wraps a search term in LIKE wildcards (SQLite LIKE ignores ASCII case).
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}
