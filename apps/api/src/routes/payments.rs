//! Mock payment gateway. Every verification is approved.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{ApiJson, Envelope};
use crate::auth::{Capability, Principal};
use crate::error::ApiResult;
use crate::state::SharedState;
use tailor_core::validation::{collect, validate_payment_amount, validate_required};
use tailor_core::{Money, PaymentMethod};

/// VPA shown for UPI payments.
const UPI_ID: &str = "tailorcraft@upi";

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/methods", get(methods))
        .route("/initiate", post(initiate))
        .route("/verify/{reference}", get(verify))
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    #[serde(default)]
    pub order_id: String,
    pub amount_paise: i64,
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct MethodInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub available: bool,
}

fn method_info(method: PaymentMethod) -> MethodInfo {
    let (description, icon) = match method {
        PaymentMethod::Cod => ("Pay when you receive the order", "cash"),
        PaymentMethod::Card => ("Visa, Mastercard, Rupay", "credit-card"),
        PaymentMethod::Upi => ("Google Pay, PhonePe, Paytm", "mobile"),
        PaymentMethod::Netbanking => ("All major banks", "bank"),
    };
    MethodInfo {
        id: method.as_str(),
        name: method.display_name(),
        description,
        icon,
        available: true,
    }
}

async fn methods() -> Envelope<Value> {
    let methods: Vec<MethodInfo> = PaymentMethod::ALL.into_iter().map(method_info).collect();
    Envelope::ok(json!({ "payment_methods": methods }))
}

async fn initiate(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(req): ApiJson<InitiateRequest>,
) -> ApiResult<Envelope<Value>> {
    collect([
        validate_required("order_id", &req.order_id),
        validate_payment_amount(req.amount_paise),
    ])?;

    let payment = state
        .db
        .payments()
        .initiate(
            &req.order_id,
            Money::from_paise(req.amount_paise),
            req.method,
            &principal.id,
        )
        .await?;

    let reference = payment.reference.clone().unwrap_or_default();
    let redirect_url =
        (req.method == PaymentMethod::Card).then(|| state.config.payment_redirect_url(&reference));
    let upi_id = (req.method == PaymentMethod::Upi).then_some(UPI_ID);

    info!(reference = %reference, order_id = %req.order_id, "Payment initiated");
    Ok(Envelope::ok(json!({
        "payment": payment,
        "payment_data": {
            "reference": reference,
            "order_id": req.order_id,
            "amount_paise": req.amount_paise,
            "method": req.method,
            "status": payment.status,
            "redirect_url": redirect_url,
            "upi_id": upi_id,
        }
    }))
    .message("Payment initiated"))
}

async fn verify(
    State(state): State<SharedState>,
    principal: Principal,
    Path(reference): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let payment = state
        .db
        .payments()
        .verify(
            &reference,
            principal.owner_filter(&[Capability::Owner, Capability::Admin]),
        )
        .await?;
    Ok(Envelope::ok(json!({ "verified": true, "payment": payment })).message("Payment successful"))
}
