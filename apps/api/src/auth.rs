//! Authentication: JWT issue/validation, password hashing and the request
//! guard.
//!
//! ## Guard Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! JwtManager::validate_token ── bad/expired ──► 401
//!        │ claims.sub
//!        ▼
//! users().get(sub) ── missing/soft-deleted ──► 401
//!        │
//!        ▼
//! Principal { id, role } ──► Principal::authorize(&[Capability], owner)
//! ```

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tailor_core::{Role, User};
use tailor_db::DbError;

// =============================================================================
// JWT
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role at issue time. The guard trusts the stored role, not this one.
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Debug, Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Issues a token for `user`.
    pub fn generate_token(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {e}")))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            ApiError::unauthorized("Not authorized, token failed").with_detail(e.to_string())
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Passwords & Reset Tokens
// =============================================================================

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))
}

/// Checks `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// A fresh reset token (64 hex chars). Only its digest is stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a reset token.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// =============================================================================
// Principal & Capabilities
// =============================================================================

/// Something a principal may hold over a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The principal owns the resource.
    Owner,
    /// The principal is an administrator.
    Admin,
}

impl Capability {
    fn granted_to(self, principal: &Principal, resource_owner: Option<&str>) -> bool {
        match self {
            Capability::Owner => resource_owner == Some(principal.id.as_str()),
            Capability::Admin => principal.role == Role::Admin,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    /// Succeeds when any of `capabilities` is granted.
    pub fn authorize(
        &self,
        capabilities: &[Capability],
        resource_owner: Option<&str>,
    ) -> ApiResult<()> {
        if capabilities
            .iter()
            .any(|capability| capability.granted_to(self, resource_owner))
        {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = self.role.as_str(), ?capabilities, "Access denied");
            Err(ApiError::forbidden())
        }
    }

    /// Ownership filter for repository queries.
    ///
    /// `None` (no filter) when `Admin` is accepted and held; otherwise the
    /// principal's own id, so other users' rows read as `NotFound`.
    pub fn owner_filter(&self, capabilities: &[Capability]) -> Option<&str> {
        let admin = capabilities.contains(&Capability::Admin)
            && Capability::Admin.granted_to(self, None);
        if admin {
            None
        } else {
            Some(&self.id)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Not authorized, no token"))?;

        let claims = state.jwt.validate_token(token).map_err(|e| {
            warn!(uri = %parts.uri, "Rejected bearer token");
            e
        })?;

        let user = match state.db.users().get(&claims.sub).await {
            Ok(user) => user,
            Err(DbError::NotFound { .. }) => {
                warn!(user_id = %claims.sub, "Token for unknown or deleted user");
                return Err(ApiError::unauthorized("User not found"));
            }
            Err(e) => return Err(e.into()),
        };

        let principal = Principal {
            id: user.id,
            role: user.role,
        };
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}
