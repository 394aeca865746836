//! HTTP routes.
//!
//! ## Route Map
//! ```text
//! /health
//! /api/auth/*       register, login, profile, passwords, logout
//! /api/products/*   catalog (public reads, admin writes)
//! /api/orders/*     checkout, history, stats, coupon, invoice, payments
//! /api/payments/*   mock gateway
//! /api/users/*      measurements, wishlist
//! /api/admin/*      listings (admin only)
//! ```
//!
//! Every success body is the envelope
//! `{"status":"success","message"?,"count"?,"data"?}`.

pub mod admin;
pub mod auth;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::{ApiError, ErrorBody};
use crate::state::SharedState;
use tailor_core::validation::resolve_page;

/// Builds the application router.
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", axum::routing::get(health::health))
        .nest("/api/auth", auth::routes())
        .nest("/api/products", products::routes())
        .nest("/api/orders", orders::routes())
        .nest("/api/payments", payments::routes())
        .nest("/api/users", users::routes())
        .nest("/api/admin", admin::routes())
        .fallback(route_not_found)
        .layer(middleware::map_response_with_state(
            state.clone(),
            error_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = match HeaderValue::from_str(config.frontend_url.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!(frontend_url = %config.frontend_url, "Unusable FRONTEND_URL, allowing any origin");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn route_not_found(request: Request) -> ApiError {
    ApiError::not_found(format!("Route {} not found", request.uri().path()))
}

/// Re-renders error bodies with their `detail` outside production.
pub async fn error_detail(State(state): State<SharedState>, mut response: Response) -> Response {
    let Some(body) = response.extensions_mut().remove::<ErrorBody>() else {
        return response;
    };
    if state.config.is_production() || body.detail.is_none() {
        return response;
    }
    (response.status(), Json(body)).into_response()
}

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            code: StatusCode::OK,
            status: "success",
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn created(data: T) -> Self {
        Envelope {
            code: StatusCode::CREATED,
            ..Envelope::ok(data)
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn status(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }
}

impl Envelope<()> {
    /// A body with only a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Envelope {
            code: StatusCode::OK,
            status: "success",
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json<T>` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Query<T>` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// `?page=&limit=` of list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// `(limit, offset)`.
    pub fn resolve(&self) -> Result<(i64, i64), ApiError> {
        Ok(resolve_page(self.page, self.limit)?)
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Router-level fixtures: an in-memory store, a recording notifier and
    //! request helpers.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::hash_password;
    use crate::config::AppConfig;
    use crate::notify::{Message, Notifier, NotifyError};
    use crate::notify::{order_confirmation_message, password_reset_message, welcome_message};
    use crate::state::AppState;
    use tailor_core::commands::NewProduct;
    use tailor_core::{OrderDetail, Role, User};
    use tailor_db::{Database, DbConfig, NewUser};

    /// Keeps every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn order_confirmation(&self, order: &OrderDetail, user: &User) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(order_confirmation_message(order, user));
            Ok(())
        }

        async fn welcome(&self, user: &User) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(welcome_message(user));
            Ok(())
        }

        async fn password_reset(&self, user: &User, reset_url: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(password_reset_message(user, reset_url));
            Ok(())
        }
    }

    pub struct TestApp {
        pub router: axum::Router,
        pub state: Arc<AppState>,
        pub notifier: Arc<RecordingNotifier>,
    }

    impl TestApp {
        pub async fn new() -> Self {
            TestApp::with_config(AppConfig::default()).await
        }

        pub async fn with_config(config: AppConfig) -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            let notifier = Arc::new(RecordingNotifier::default());
            let state = AppState::with_notifier(db, config, notifier.clone()).shared();
            TestApp {
                router: super::router(state.clone()),
                state,
                notifier,
            }
        }

        /// Sends a request; returns the status and the JSON body (Null when empty).
        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, bytes) = self.send_raw(method, uri, token, body).await;
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        pub async fn send_raw(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(json) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, bytes.to_vec())
        }

        /// Inserts a user directly and returns `(user, token)`.
        pub async fn user(&self, email: &str, role: Role) -> (User, String) {
            let user = self
                .state
                .db
                .users()
                .create(&NewUser {
                    name: "Test User".to_string(),
                    email: email.to_string(),
                    password_hash: hash_password("secret1").unwrap(),
                    phone: Some("9876543210".to_string()),
                    role,
                })
                .await
                .unwrap();
            let token = self.state.jwt.generate_token(&user).unwrap();
            (user, token)
        }

        /// Inserts a customizable product (×1.2) and returns its id.
        pub async fn product(&self, name: &str, price_paise: i64, stock: i64) -> String {
            let new = NewProduct {
                name: name.to_string(),
                description: Some(format!("{name} in handloom cotton")),
                price_paise,
                original_price_paise: None,
                category: "Kurtas".to_string(),
                material: Some("Cotton".to_string()),
                stock,
                is_customizable: true,
                custom_price_multiplier_bps: Some(12_000),
                featured: false,
                images: vec![format!("https://img.example/{name}.jpg")],
                variants: Vec::new(),
            };
            self.state.db.products().create(&new).await.unwrap().product.id
        }
    }
}
