//! API server configuration.
//!
//! Loaded once from environment variables at startup, with defaults for
//! local development, then shared read-only through [`crate::AppState`].

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use tailor_db::DbConfig;

/// Secret used when `JWT_SECRET` is unset. Refused in production.
const DEV_JWT_SECRET: &str = "tailorcraft-dev-secret-change-in-production";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue("APP_ENV".to_string())),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT lifetime in seconds (default: 7 days)
    pub jwt_lifetime_secs: i64,

    /// Storefront origin, used for CORS and links in notifications
    pub frontend_url: String,

    pub environment: Environment,

    /// Sender address on outgoing notifications
    pub mail_from: String,

    /// Password reset token lifetime in seconds (default: 1 hour)
    pub reset_token_lifetime_secs: i64,

    /// Recompute order discounts from the coupon code instead of trusting the client
    pub enforce_coupon_discount: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: "tailorcraft.db".to_string(),
            db_max_connections: 10,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 7 * 24 * 3600,
            frontend_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            mail_from: "TailorCraft <noreply@tailorcraft.com>".to_string(),
            reset_token_lifetime_secs: 3600,
            enforce_coupon_discount: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// ## Variables
    /// `HOST`, `PORT`, `DATABASE_PATH`, `DB_MAX_CONNECTIONS`, `JWT_SECRET`,
    /// `JWT_LIFETIME_SECS`, `FRONTEND_URL`, `APP_ENV`, `MAIL_FROM`,
    /// `RESET_TOKEN_LIFETIME_SECS`, `ENFORCE_COUPON_DISCOUNT`.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config = AppConfig {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_lifetime_secs: parse_var("JWT_LIFETIME_SECS", defaults.jwt_lifetime_secs)?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            environment: parse_var("APP_ENV", defaults.environment)?,
            mail_from: env::var("MAIL_FROM").unwrap_or(defaults.mail_from),
            reset_token_lifetime_secs: parse_var(
                "RESET_TOKEN_LIFETIME_SECS",
                defaults.reset_token_lifetime_secs,
            )?,
            enforce_coupon_discount: parse_var(
                "ENFORCE_COUPON_DISCOUNT",
                defaults.enforce_coupon_discount,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production() && self.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InsecureSecret);
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }
        if self.reset_token_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("RESET_TOKEN_LIFETIME_SECS".to_string()));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }

    /// Storefront page where a password is reset with `token`.
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/reset-password/{}", self.frontend_url.trim_end_matches('/'), token)
    }

    /// Storefront page a card payment is redirected to.
    pub fn payment_redirect_url(&self, reference: &str) -> String {
        format!("{}/payment-process/{}", self.frontend_url.trim_end_matches('/'), reference)
    }
}

/// Reads `var`, falling back to `default` when unset.
fn parse_var<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("JWT_SECRET must be set in production")]
    InsecureSecret,

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
