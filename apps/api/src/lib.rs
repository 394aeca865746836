//! # TailorCraft API
//!
//! REST backend for a made-to-measure clothing store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TailorCraft API                                │
//! │                                                                         │
//! │  Storefront / Admin ───► axum Router ───► handlers ───► tailor-db      │
//! │                              │                │              │          │
//! │                              ▼                ▼              ▼          │
//! │                        JWT guard        Notifier        SQLite          │
//! │                        (Principal)      Invoice PDF     (order engine)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`AppConfig::load`]):
//! - `HOST`, `PORT` - listen address (default: 0.0.0.0:5000)
//! - `DATABASE_PATH` - SQLite file (default: tailorcraft.db)
//! - `JWT_SECRET` - token signing secret, required in production
//! - `FRONTEND_URL` - storefront origin for CORS and links
//! - `APP_ENV` - `development` or `production`
//! - `ENFORCE_COUPON_DISCOUNT` - recompute discounts from coupon codes (default: true)

pub mod auth;
pub mod config;
pub mod error;
pub mod invoice;
pub mod notify;
pub mod routes;
pub mod state;

// Re-exports
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, SharedState};
