//! Per-user data: saved measurements and the wishlist.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiJson, Envelope};
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use tailor_core::commands::{MeasurementUpdate, NewMeasurement};
use tailor_core::validation::{
    validate_measurement_update, validate_new_measurement, validate_required,
};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/measurements", get(list_measurements).post(create_measurement))
        .route(
            "/measurements/{id}",
            get(get_measurement)
                .put(update_measurement)
                .delete(delete_measurement),
        )
        .route("/wishlist", get(list_wishlist).post(add_to_wishlist))
        .route("/wishlist/{product_id}", delete(remove_from_wishlist))
}

// =============================================================================
// Measurements
// =============================================================================

async fn list_measurements(
    State(state): State<SharedState>,
    principal: Principal,
) -> ApiResult<Envelope<Value>> {
    let measurements = state.db.measurements().list(&principal.id).await?;
    let count = measurements.len();
    Ok(Envelope::ok(json!({ "measurements": measurements })).count(count))
}

async fn get_measurement(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let measurement = state.db.measurements().get(&id, &principal.id).await?;
    Ok(Envelope::ok(json!({ "measurement": measurement })))
}

async fn create_measurement(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(new): ApiJson<NewMeasurement>,
) -> ApiResult<Envelope<Value>> {
    validate_new_measurement(&new)?;
    let measurement = state.db.measurements().create(&principal.id, &new).await?;
    Ok(Envelope::created(json!({ "measurement": measurement }))
        .message("Measurement saved successfully"))
}

async fn update_measurement(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<MeasurementUpdate>,
) -> ApiResult<Envelope<Value>> {
    if update.is_empty() {
        return Err(ApiError::bad_request("No data to update"));
    }
    validate_measurement_update(&update)?;

    let measurement = state
        .db
        .measurements()
        .update(&id, &principal.id, &update)
        .await?;
    Ok(Envelope::ok(json!({ "measurement": measurement }))
        .message("Measurement updated successfully"))
}

async fn delete_measurement(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    state.db.measurements().delete(&id, &principal.id).await?;
    Ok(Envelope::message_only("Measurement deleted successfully"))
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    #[serde(default)]
    pub product_id: String,
}

async fn list_wishlist(
    State(state): State<SharedState>,
    principal: Principal,
) -> ApiResult<Envelope<Value>> {
    let wishlist = state.db.wishlist().list(&principal.id).await?;
    let count = wishlist.len();
    Ok(Envelope::ok(json!({ "wishlist": wishlist })).count(count))
}

async fn add_to_wishlist(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(req): ApiJson<WishlistRequest>,
) -> ApiResult<Envelope<()>> {
    validate_required("product_id", &req.product_id)?;
    state.db.wishlist().add(&principal.id, &req.product_id).await?;

    Ok(Envelope::message_only("Added to wishlist").status(StatusCode::CREATED))
}

async fn remove_from_wishlist(
    State(state): State<SharedState>,
    principal: Principal,
    Path(product_id): Path<String>,
) -> ApiResult<Envelope<()>> {
    state.db.wishlist().remove(&principal.id, &product_id).await?;
    Ok(Envelope::message_only("Removed from wishlist"))
}
