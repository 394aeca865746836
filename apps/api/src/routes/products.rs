//! Catalog endpoints. Reads are public; writes need an admin.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiJson, ApiQuery, Envelope};
use crate::auth::{Capability, Principal};
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use tailor_core::commands::{NewProduct, ProductQuery, ProductUpdate};
use tailor_core::validation::{
    resolve_page, validate_new_product, validate_product_update, validate_search_query,
};
use tailor_core::DEFAULT_PAGE_LIMIT;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/categories", get(categories))
        .route("/filters", get(filters))
        .route("/search", get(search))
        .route("/{id}", get(detail).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

async fn list(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Envelope<Value>> {
    let (limit, offset) = resolve_page(query.page, query.limit)?;
    let (products, total) = state.db.products().list(&query, limit, offset).await?;

    let count = products.len();
    Ok(Envelope::ok(json!({
        "products": products,
        "pagination": {
            "page": offset / limit + 1,
            "limit": limit,
            "total": total,
            "pages": (total + limit - 1) / limit,
        }
    }))
    .count(count))
}

async fn categories(State(state): State<SharedState>) -> ApiResult<Envelope<Value>> {
    let categories = state.db.products().categories().await?;
    let count = categories.len();
    Ok(Envelope::ok(json!({ "categories": categories })).count(count))
}

async fn filters(State(state): State<SharedState>) -> ApiResult<Envelope<Value>> {
    let filters = state.db.products().filters().await?;
    Ok(Envelope::ok(json!({ "filters": filters })))
}

async fn search(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Envelope<Value>> {
    let term = validate_search_query(&params.q)?;
    let (limit, _) = resolve_page(None, Some(params.limit.unwrap_or(DEFAULT_PAGE_LIMIT)))?;

    let products = state.db.products().search(&term, limit).await?;
    let count = products.len();
    Ok(Envelope::ok(json!({ "products": products })).count(count))
}

async fn detail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let product = state.db.products().get_detail(&id).await?;
    Ok(Envelope::ok(json!({ "product": product })))
}

async fn create(
    State(state): State<SharedState>,
    principal: Principal,
    ApiJson(new): ApiJson<NewProduct>,
) -> ApiResult<Envelope<Value>> {
    principal.authorize(&[Capability::Admin], None)?;
    validate_new_product(&new)?;

    let product = state.db.products().create(&new).await?;
    info!(id = %product.product.id, admin = %principal.id, "Product created");
    Ok(Envelope::created(json!({ "product": product })).message("Product created successfully"))
}

async fn update(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<Envelope<Value>> {
    principal.authorize(&[Capability::Admin], None)?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No data to update"));
    }
    validate_product_update(&update)?;

    let product = state.db.products().update(&id, &update).await?;
    Ok(Envelope::ok(json!({ "product": product })).message("Product updated successfully"))
}

async fn remove(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    principal.authorize(&[Capability::Admin], None)?;
    state.db.products().soft_delete(&id).await?;
    Ok(Envelope::message_only("Product deleted successfully"))
}
