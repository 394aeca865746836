//! # tailor-db: Database Layer for TailorCraft
//!
//! SQLite storage through sqlx. Every SQL statement of the system lives in
//! this crate, including the order engine's transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TailorCraft Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tailor-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo ◄────┼──┐ │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo    │  │ │ 001_init.sql │  │   │
//! │  │   │               │    │ PaymentRepo    │  │ │              │  │   │
//! │  │   │               │    │ UserRepo ...   │  │ │              │  │   │
//! │  │   └───────────────┘    └────────────────┘  │ └──────────────┘  │   │
//! │  │                                            │                   │   │
//! │  │                       tailor-core pricing ─┘                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tailor_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tailorcraft.db")).await?;
//!
//! let order = db.orders().create(&buyer_id, &new_order, DiscountPolicy::Enforce).await?;
//! let stats = db.orders().stats(&buyer_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::measurement::MeasurementRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::user::{NewUser, UserCredentials, UserRepository};
pub use repository::wishlist::WishlistRepository;
