//! Shared application state.

use std::sync::Arc;

use tailor_core::coupon::DiscountPolicy;
use tailor_db::Database;

use crate::auth::JwtManager;
use crate::config::AppConfig;
use crate::notify::{LogNotifier, Notifier};

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub jwt: JwtManager,
    pub notifier: Arc<dyn Notifier>,
}

/// Handle passed to the router.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// State with the logging notifier.
    pub fn new(db: Database, config: AppConfig) -> Self {
        let notifier = Arc::new(LogNotifier::new(config.mail_from.clone()));
        AppState::with_notifier(db, config, notifier)
    }

    pub fn with_notifier(db: Database, config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            db,
            config,
            jwt,
            notifier,
        }
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        DiscountPolicy::from_enforce_flag(self.config.enforce_coupon_discount)
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
