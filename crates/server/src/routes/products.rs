//! Product catalog endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::{Product, catalog};
use crate::state::AppState;

/// Catalog query filters, all optional and combinable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub size: Option<String>,
    /// Only `inStock=true` filters; any other value is ignored.
    #[serde(default)]
    pub in_stock: Option<bool>,
    /// Free-text search over name, description, and category.
    pub q: Option<String>,
}

/// List the catalog, narrowed by the query filters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let mut products = state.catalog().products().await.as_ref().clone();

    if let Some(category) = &query.category {
        catalog::by_category(&mut products, category);
    }
    if let Some(size) = &query.size {
        catalog::by_size(&mut products, size);
    }
    if query.in_stock == Some(true) {
        catalog::in_stock_only(&mut products);
    }
    if let Some(q) = &query.q {
        catalog::search(&mut products, q);
    }

    Json(products)
}

/// Fetch a single product by catalog id.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    match state.catalog().product_by_id(&id).await {
        Some(product) => Ok(Json(product)),
        None => Err(AppError::NotFound("Product not found".to_owned())),
    }
}
