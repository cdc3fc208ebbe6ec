//! Unauthenticated catalog surface.
//!
//! The public listing is the one place the `Approved`-only filter is
//! hard-wired; every other consumer (supplier dashboard, admin queues)
//! queries by explicit status. Products of non-active suppliers are hidden
//! here as well, without touching product state.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use tradepost_catalog::{ProductId, ProductStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let projections = services.projections();
    let suppliers = projections.suppliers.clone();
    let items = projections
        .products
        .list_public(|sid| suppliers.get(&sid).is_some_and(|s| s.is_active()))
        .into_iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match id.parse::<tradepost_core::AggregateId>() {
        Ok(agg) => ProductId::new(agg),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    let projections = services.projections();
    let Some(record) = projections.products.get(&product_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
    };

    let supplier_active = projections
        .suppliers
        .get(&record.supplier_id)
        .is_some_and(|s| s.is_active());
    if record.status != ProductStatus::Approved || !supplier_active {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
    }

    projections.products.record_view(&product_id);
    let mut record = record;
    record.view_count += 1;

    (StatusCode::OK, Json(dto::product_to_json(record))).into_response()
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .projections()
        .categories
        .list_active()
        .iter()
        .map(dto::category_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
