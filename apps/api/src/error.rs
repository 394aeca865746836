//! Error types for the API.
//!
//! Every failure a handler can hit ends up as an [`ApiError`], which renders
//! the error envelope:
//!
//! ```text
//! {"status":"error","code":"CONFLICT","message":"...","errors":[{field,message}],"detail":"..."}
//! ```
//!
//! `errors` is present only for validation failures. `detail` carries the
//! underlying error text; [`crate::routes::error_detail`] strips it in
//! production.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use tailor_core::validation::ValidationErrors;
use tailor_core::{CoreError, ValidationError};
use tailor_db::DbError;

use crate::invoice::InvoiceError;

/// One entry of the `errors` list.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Error body. Also stored in the response extensions so the detail can be
/// dropped outside development.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// API error: HTTP status, machine code, human message.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub errors: Vec<FieldError>,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            errors: Vec::new(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden() -> Self {
        ApiError::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "You do not have permission to perform this action",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 500 with a generic message; the cause only goes to `detail`.
    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
        .with_detail(detail)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 400 listing every field problem.
    pub fn validation(errors: &[ValidationError]) -> Self {
        let mut err = ApiError::bad_request("Validation failed");
        err.errors = errors.iter().map(FieldError::from).collect();
        err
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            status: "error",
            code: self.code,
            message: self.message.clone(),
            errors: self.errors.clone(),
            detail: self.detail.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                code = self.code,
                detail = self.detail.as_deref().unwrap_or(""),
                "Request failed"
            );
        }

        let full = self.body();
        let public = ErrorBody {
            detail: None,
            ..full.clone()
        };

        let mut response = (self.status, Json(public)).into_response();
        response.extensions_mut().insert(full);
        response
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let detail = err.to_string();
        match err {
            DbError::NotFound { entity, .. } => {
                ApiError::not_found(format!("{entity} not found")).with_detail(detail)
            }
            DbError::UniqueViolation { ref field, .. } if field == "email" => {
                ApiError::conflict("User already exists with this email").with_detail(detail)
            }
            DbError::UniqueViolation { .. } | DbError::InsufficientStock { .. } => {
                ApiError::conflict(detail)
            }
            DbError::InvalidInput(message) => ApiError::bad_request(message),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::bad_request("Referenced record does not exist").with_detail(detail)
            }
            _ => ApiError::internal(detail),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(ref validation) => {
                ApiError::validation(std::slice::from_ref(validation))
            }
            CoreError::InvalidOrderStatus(_)
            | CoreError::DiscountExceedsSubtotal { .. }
            | CoreError::AmountOutOfRange
            | CoreError::InvalidCoupon(_) => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(std::slice::from_ref(&err))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation(&errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Invalid request body").with_detail(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("Invalid query parameters").with_detail(rejection.body_text())
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        ApiError::internal(err.to_string())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
