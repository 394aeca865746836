//! Order endpoints.
//!
//! ## Checkout Flow
//! ```text
//! POST /api/orders
//!   │
//!   ├── validate_new_order        (400 with every field problem)
//!   ├── orders().create           (one transaction: price, decrement, insert)
//!   │      └── 404 product │ 409 stock │ 400 coupon/discount
//!   ├── 201 {order}
//!   └── spawn: notifier.order_confirmation   (failures only logged)
//! ```

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ApiJson, ApiQuery, Envelope};
use crate::auth::{Capability, Principal};
use crate::error::ApiResult;
use crate::invoice::render_invoice;
use crate::state::SharedState;
use tailor_core::commands::NewOrder;
use tailor_core::coupon;
use tailor_core::validation::{
    resolve_page, validate_new_order, validate_payment_amount, validate_required,
};
use tailor_core::{Money, OrderDetail, OrderStatus, PaymentMethod};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/stats", get(stats))
        .route("/coupon", post(apply_coupon))
        .route("/{id}", get(detail))
        .route("/{id}/cancel", put(cancel))
        .route("/{id}/invoice", get(invoice))
        .route("/{id}/payment", post(add_payment))
        .route("/{id}/status", put(update_status))
}

const OWNER_OR_ADMIN: [Capability; 2] = [Capability::Owner, Capability::Admin];

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    #[serde(default)]
    pub code: String,
    pub subtotal_paise: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount_paise: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(new): ApiJson<NewOrder>,
) -> ApiResult<Envelope<Value>> {
    validate_new_order(&new)?;

    let order = state
        .db
        .orders()
        .create(&principal.id, &new, state.discount_policy())
        .await?;
    info!(
        order_number = %order.order.order_number,
        user_id = %principal.id,
        total = %order.order.total(),
        "Order placed"
    );

    send_confirmation(state, principal.id, order.clone());

    Ok(Envelope::created(json!({ "order": order })).message("Order created successfully"))
}

/// Sends the confirmation in the background.
fn send_confirmation(state: SharedState, user_id: String, order: OrderDetail) {
    tokio::spawn(async move {
        let user = match state.db.users().get(&user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Confirmation skipped, buyer not loaded");
                return;
            }
        };
        if let Err(e) = state.notifier.order_confirmation(&order, &user).await {
            warn!(order_number = %order.order.order_number, error = %e, "Order confirmation failed");
        }
    });
}

async fn list(
    State(state): State<SharedState>,
    principal: Principal,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Envelope<Value>> {
    let (limit, offset) = resolve_page(params.page, params.limit)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let orders = state
        .db
        .orders()
        .list(Some(&principal.id), status, limit, offset)
        .await?;
    let count = orders.len();
    Ok(Envelope::ok(json!({ "orders": orders })).count(count))
}

async fn stats(
    State(state): State<SharedState>,
    principal: Principal,
) -> ApiResult<Envelope<Value>> {
    let stats = state.db.orders().stats(&principal.id).await?;
    Ok(Envelope::ok(json!({ "stats": stats })))
}

async fn apply_coupon(
    _principal: Principal,
    ApiJson(req): ApiJson<CouponRequest>,
) -> ApiResult<Envelope<Value>> {
    validate_required("code", &req.code)?;
    let coupon = coupon::lookup(&req.code)?;

    let mut data = json!({ "coupon": coupon });
    if let Some(subtotal) = req.subtotal_paise {
        data["discount_paise"] = json!(coupon.discount_for(Money::from_paise(subtotal))?.paise());
    }
    Ok(Envelope::ok(data).message("Coupon applied successfully"))
}

async fn detail(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let order = state
        .db
        .orders()
        .find(&id, principal.owner_filter(&OWNER_OR_ADMIN))
        .await?;
    Ok(Envelope::ok(json!({ "order": order })))
}

async fn cancel(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let order = state
        .db
        .orders()
        .update_status(&id, OrderStatus::Cancelled.as_str(), Some(&principal.id))
        .await?;
    info!(order_number = %order.order_number, user_id = %principal.id, "Order cancelled");
    Ok(Envelope::ok(json!({ "order": order })).message("Order cancelled successfully"))
}

async fn invoice(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let order = state
        .db
        .orders()
        .find(&id, principal.owner_filter(&OWNER_OR_ADMIN))
        .await?;
    let pdf = render_invoice(&order)?;

    let disposition = format!(
        "attachment; filename=invoice-{}.pdf",
        order.order.order_number
    );
    Ok(([(CONTENT_TYPE, "application/pdf".to_string()), (CONTENT_DISPOSITION, disposition)], pdf)
        .into_response())
}

async fn add_payment(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<Envelope<Value>> {
    validate_payment_amount(req.amount_paise)?;

    let (payment, order) = state
        .db
        .orders()
        .add_payment(
            &id,
            Money::from_paise(req.amount_paise),
            req.payment_method,
            principal.owner_filter(&OWNER_OR_ADMIN),
        )
        .await?;
    info!(order_number = %order.order_number, amount = %payment.amount(), "Payment added");
    Ok(Envelope::ok(json!({ "payment": payment, "order": order }))
        .message("Payment added successfully"))
}

async fn update_status(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Envelope<Value>> {
    principal.authorize(&[Capability::Admin], None)?;
    validate_required("status", &req.status)?;

    let order = state
        .db
        .orders()
        .update_status(&id, req.status.trim(), None)
        .await?;
    info!(order_number = %order.order_number, status = %order.status, "Order status updated");
    Ok(Envelope::ok(json!({ "order": order })).message("Order status updated successfully"))
}
