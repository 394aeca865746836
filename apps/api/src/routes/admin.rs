//! Admin listings.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiQuery, Envelope, PageParams};
use crate::auth::{Capability, Principal};
use crate::error::ApiResult;
use crate::state::SharedState;
use tailor_core::{OrderStatus, Role};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/orders", get(orders))
        .route("/customers", get(customers))
        .route("/workers", get(workers))
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

async fn orders(
    State(state): State<SharedState>,
    principal: Principal,
    ApiQuery(params): ApiQuery<OrderListParams>,
) -> ApiResult<Envelope<Value>> {
    principal.authorize(&[Capability::Admin], None)?;

    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (limit, offset) = page.resolve()?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let orders = state.db.orders().list(None, status, limit, offset).await?;
    let count = orders.len();
    Ok(Envelope::ok(json!({ "orders": orders })).count(count))
}

async fn customers(
    state: State<SharedState>,
    principal: Principal,
    page: ApiQuery<PageParams>,
) -> ApiResult<Envelope<Value>> {
    users_with_role(state, principal, page, Role::Customer, "customers").await
}

async fn workers(
    state: State<SharedState>,
    principal: Principal,
    page: ApiQuery<PageParams>,
) -> ApiResult<Envelope<Value>> {
    users_with_role(state, principal, page, Role::Worker, "workers").await
}

async fn users_with_role(
    State(state): State<SharedState>,
    principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    role: Role,
    key: &str,
) -> ApiResult<Envelope<Value>> {
    principal.authorize(&[Capability::Admin], None)?;

    let (limit, offset) = page.resolve()?;
    let users = state.db.users().list_by_role(role, limit, offset).await?;
    let count = users.len();
    Ok(Envelope::ok(json!({ key: users })).count(count))
}
