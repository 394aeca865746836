//! Liveness check.

use axum::extract::State;
use serde_json::{json, Value};

use super::Envelope;
use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Envelope<Value> {
    let database = state.db.health_check().await;
    Envelope::ok(json!({
        "service": "tailor-api",
        "version": env!("CARGO_PKG_VERSION"),
        "database": if database { "up" } else { "down" },
    }))
    .message("TailorCraft API is running")
}
