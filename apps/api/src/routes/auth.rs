//! Account endpoints: registration, login, profile and passwords.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ApiJson, Envelope};
use crate::auth::{digest_token, generate_reset_token, hash_password, verify_password, Principal};
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use tailor_core::commands::UserUpdate;
use tailor_core::validation::{
    collect, normalize_email, validate_email, validate_password, validate_person_name,
    validate_phone, validate_required, validate_user_update,
};
use tailor_core::Role;
use tailor_db::NewUser;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password))
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route("/logout", post(logout))
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Envelope<Value>> {
    collect([
        validate_person_name(req.name.trim()),
        validate_email(&req.email),
        validate_password("password", &req.password),
        validate_phone(&req.phone),
    ])?;

    let user = state
        .db
        .users()
        .create(&NewUser {
            name: req.name.trim().to_string(),
            email: normalize_email(&req.email),
            password_hash: hash_password(&req.password)?,
            phone: Some(req.phone.trim().to_string()),
            role: Role::Customer,
        })
        .await?;
    let token = state.jwt.generate_token(&user)?;

    if let Err(e) = state.notifier.welcome(&user).await {
        warn!(user_id = %user.id, error = %e, "Welcome notification failed");
    }

    Ok(Envelope::created(json!({ "user": user, "token": token }))
        .message("User registered successfully"))
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Envelope<Value>> {
    collect([
        validate_email(&req.email),
        validate_required("password", &req.password),
    ])?;

    let email = normalize_email(&req.email);
    let credentials = state.db.users().find_credentials_by_email(&email).await?;

    let Some(credentials) = credentials
        .filter(|credentials| verify_password(&req.password, &credentials.password_hash))
    else {
        warn!(email = %email, "Failed login");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let user = credentials.user;
    let token = state.jwt.generate_token(&user)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Envelope::ok(json!({ "user": user, "token": token })).message("Logged in successfully"))
}

async fn profile(
    State(state): State<SharedState>,
    principal: Principal,
) -> ApiResult<Envelope<Value>> {
    let user = state.db.users().get(&principal.id).await?;
    Ok(Envelope::ok(json!({ "user": user })))
}

async fn update_profile(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Envelope<Value>> {
    if update.is_empty() {
        return Err(ApiError::bad_request("No data to update"));
    }
    validate_user_update(&update)?;

    let user = state.db.users().update_profile(&principal.id, &update).await?;
    Ok(Envelope::ok(json!({ "user": user })).message("Profile updated successfully"))
}

async fn change_password(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Envelope<()>> {
    collect([
        validate_required("current_password", &req.current_password),
        validate_password("new_password", &req.new_password),
    ])?;

    let users = state.db.users();
    let stored = users.password_hash(&principal.id).await?;
    if !verify_password(&req.current_password, &stored) {
        warn!(user_id = %principal.id, "Wrong current password");
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    users
        .set_password(&principal.id, &hash_password(&req.new_password)?)
        .await?;
    Ok(Envelope::message_only("Password changed successfully"))
}

async fn forgot_password(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Envelope<()>> {
    validate_email(&req.email)?;

    let users = state.db.users();
    let Some(user) = users.find_by_email(&normalize_email(&req.email)).await? else {
        return Err(ApiError::not_found("No user found with this email"));
    };

    let token = generate_reset_token();
    let expires_at = Utc::now() + Duration::seconds(state.config.reset_token_lifetime_secs);
    users
        .set_reset_token(&user.id, &digest_token(&token), expires_at)
        .await?;

    let reset_url = state.config.reset_url(&token);
    if let Err(e) = state.notifier.password_reset(&user, &reset_url).await {
        warn!(user_id = %user.id, error = %e, "Password reset notification failed");
    }

    Ok(Envelope::message_only("Password reset email sent"))
}

async fn reset_password(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Envelope<()>> {
    validate_password("password", &req.password)?;

    state
        .db
        .users()
        .reset_password(&digest_token(&token), &hash_password(&req.password)?, Utc::now())
        .await?;
    Ok(Envelope::message_only("Password reset successfully"))
}

/// Tokens are stateless; the client discards its copy.
async fn logout(principal: Principal) -> Envelope<()> {
    info!(user_id = %principal.id, "User logged out");
    Envelope::message_only("Logged out successfully")
}

#[cfg(test)]
mod tests {
    use super::super::testing::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;
    use tailor_core::Role;

    fn registration(email: &str) -> serde_json::Value {
        json!({
            "name": "Priya Nair",
            "email": email,
            "password": "secret1",
            "phone": "9876543210"
        })
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send("POST", "/api/auth/register", None, Some(registration("Priya@Example.in")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["email"], "priya@example.in");
        assert_eq!(body["data"]["user"]["role"], "customer");
        assert!(body["data"]["token"].is_string());
        assert_eq!(app.notifier.sent.lock().unwrap().len(), 1);

        let (status, _) = app
            .send("POST", "/api/auth/register", None, Some(registration("priya@example.in")))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "priya@example.in", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = app.send("GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["name"], "Priya Nair");

        let (status, body) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "priya@example.in", "password": "wrong-one"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_register_validation_lists_fields() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"name": "P", "email": "nope", "password": "123", "phone": "12"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, ["name", "email", "password", "phone"]);
    }

    #[tokio::test]
    async fn test_guard_rejects_missing_and_bad_tokens() {
        let app = TestApp::new().await;

        let (status, body) = app.send("GET", "/api/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");

        let (status, body) = app
            .send("GET", "/api/auth/profile", Some("not.a.jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        // development keeps the underlying cause
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_profile_update_and_password_change() {
        let app = TestApp::new().await;
        let (_, token) = app.user("anil@example.in", Role::Customer).await;

        let (status, body) = app
            .send("PUT", "/api/auth/profile", Some(&token), Some(json!({"phone": "9000000001"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["phone"], "9000000001");

        let (status, _) = app
            .send("PUT", "/api/auth/profile", Some(&token), Some(json!({"role": "admin"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send("PUT", "/api/auth/profile", Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "PUT",
                "/api/auth/change-password",
                Some(&token),
                Some(json!({"current_password": "wrong!", "new_password": "secret2"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                "PUT",
                "/api/auth/change-password",
                Some(&token),
                Some(json!({"current_password": "secret1", "new_password": "secret2"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "anil@example.in", "password": "secret2"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let app = TestApp::new().await;
        app.user("reset@example.in", Role::Customer).await;

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/forgot-password",
                None,
                Some(json!({"email": "ghost@example.in"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/forgot-password",
                None,
                Some(json!({"email": "reset@example.in"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let body = app.notifier.sent.lock().unwrap()[0].body.clone();
        let token = body
            .split("/reset-password/")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string();

        let uri = format!("/api/auth/reset-password/{token}");
        let (status, _) = app
            .send("POST", &uri, None, Some(json!({"password": "fresh-pass"})))
            .await;
        assert_eq!(status, StatusCode::OK);

        // single use
        let (status, body) = app
            .send("POST", &uri, None, Some(json!({"password": "again-pass"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired reset token");

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "reset@example.in", "password": "fresh-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_requires_token() {
        let app = TestApp::new().await;
        let (_, token) = app.user("bye@example.in", Role::Customer).await;

        let (status, body) = app.send("POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");

        let (status, _) = app.send("POST", "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
