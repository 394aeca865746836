//! # User Repository
//!
//! Accounts, password hashes and password-reset tokens.
//!
//! Hashing happens in the API layer; this repository only stores the
//! resulting strings. Reset tokens are stored as a SHA-256 hex digest, never
//! in the clear.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tailor_core::commands::UserUpdate;
use tailor_core::{Role, User};

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// A user about to be inserted. The email must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// A user together with their stored password hash (login path only).
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, name, email, phone, role, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user. A taken email is reported as a duplicate `email`.
    pub async fn create(&self, new: &NewUser) -> DbResult<User> {
        let id = generate_id();
        let now = Utc::now();

        debug!(id = %id, role = new.role.as_str(), "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(new.name.trim())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.phone.as_deref())
        .bind(new.role)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &new.email),
            other => other,
        })?;

        info!(id = %id, "User registered");
        self.get(&id).await
    }

    /// Gets an active (not soft-deleted) user.
    pub async fn get(&self, id: &str) -> DbResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or_else(|| DbError::not_found("User", id))
    }

    /// Gets an active user by (normalized) email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        Ok(self
            .find_credentials_by_email(email)
            .await?
            .map(|credentials| credentials.user))
    }

    /// Loads a user and their password hash for login.
    pub async fn find_credentials_by_email(&self, email: &str) -> DbResult<Option<UserCredentials>> {
        let row: Option<CredentialsRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserCredentials {
            user: row.user.into(),
            password_hash: row.password_hash,
        }))
    }

    /// Stored password hash of an active user.
    pub async fn password_hash(&self, id: &str) -> DbResult<String> {
        let hash: Option<String> = sqlx::query_scalar(
            "SELECT password_hash FROM users WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        hash.ok_or_else(|| DbError::not_found("User", id))
    }

    /// Updates name and/or phone.
    pub async fn update_profile(&self, id: &str, update: &UserUpdate) -> DbResult<User> {
        if update.is_empty() {
            return Err(DbError::InvalidInput("No fields to update".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?1, name),
                phone = COALESCE(?2, phone),
                updated_at = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.phone.as_deref())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get(id).await
    }

    /// Replaces the password hash.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "Password changed");
        Ok(())
    }

    /// Stores a reset token digest and its expiry, replacing any earlier one.
    pub async fn set_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET reset_token_hash = ?1, reset_token_expires_at = ?2, updated_at = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        debug!(id = %id, "Reset token stored");
        Ok(())
    }

    /// Sets a new password using a reset token. The token is single use.
    ///
    /// ## Errors
    /// Unknown or expired token → `InvalidInput`.
    pub async fn reset_password(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> DbResult<User> {
        let invalid = || DbError::InvalidInput("Invalid or expired reset token".to_string());

        let found: Option<(String, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            SELECT id, reset_token_expires_at FROM users
            WHERE reset_token_hash = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let id = match found {
            Some((id, Some(expires_at))) if expires_at > now => id,
            _ => return Err(invalid()),
        };

        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = ?1,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = ?2
            WHERE id = ?3 AND reset_token_hash = ?4
            "#,
        )
        .bind(new_password_hash)
        .bind(now)
        .bind(&id)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid());
        }

        info!(id = %id, "Password reset");
        self.get(&id).await
    }

    /// Active users with the given role, newest first.
    pub async fn list_by_role(&self, role: Role, limit: i64, offset: i64) -> DbResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = ?1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
