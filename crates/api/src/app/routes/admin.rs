//! Moderation console: supplier/buyer/product/inquiry queues, category
//! administration, the admin notification feed, and the event audit trail.
//!
//! Every route requires the admin role. Moderation verbs go through the
//! dispatcher like any other command; the aggregates own the transition
//! rules, this module owns input validation (non-empty suspension reasons,
//! id parsing) and the HTTP mapping.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;

use tradepost_auth::{Permission, Role};
use tradepost_buyers::{
    ActivateBuyer, BuyerCommand, BuyerId, BuyerProfile, DeleteBuyer, SuspendBuyer,
};
use tradepost_catalog::{
    ApproveProduct, CategoryId, Product, ProductCommand, ProductId, PurgeProduct,
    ReinstateProduct, RejectProduct, RestoreProduct, SuspendProduct,
};
use tradepost_core::AggregateId;
use tradepost_infra::event_store::{EventFilter, Pagination};
use tradepost_infra::streams;
use tradepost_inquiries::{
    ApproveInquiry, Inquiry, InquiryCommand, InquiryId, RejectInquiry,
};
use tradepost_suppliers::{
    ActivateProfile, ApproveProfile, DeleteProfile, RejectProfile, RestoreProfile,
    SupplierCommand, SupplierId, SupplierProfile, SuspendProfile,
};

use crate::app::routes::common::{CmdAuth, enrich_inquiry, require_role};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/suppliers", get(list_suppliers))
        .route("/suppliers/:id/approve", post(approve_supplier))
        .route("/suppliers/:id/reject", post(reject_supplier))
        .route("/suppliers/:id/suspend", post(suspend_supplier))
        .route("/suppliers/:id/activate", post(activate_supplier))
        .route("/suppliers/:id/delete", post(delete_supplier))
        .route("/suppliers/:id/restore", post(restore_supplier))
        .route("/buyers", get(list_buyers))
        .route("/buyers/:id", axum::routing::delete(delete_buyer))
        .route("/buyers/:id/suspend", post(suspend_buyer))
        .route("/buyers/:id/activate", post(activate_buyer))
        .route("/products", get(list_products))
        .route("/products/:id", axum::routing::delete(purge_product))
        .route("/products/:id/approve", post(approve_product))
        .route("/products/:id/reject", post(reject_product))
        .route("/products/:id/suspend", post(suspend_product))
        .route("/products/:id/reinstate", post(reinstate_product))
        .route("/products/:id/restore", post(restore_product))
        .route("/inquiries/pending", get(list_pending_inquiries))
        .route("/inquiries/approved", get(list_approved_inquiries))
        .route("/inquiries/:id/approve", post(approve_inquiry))
        .route("/inquiries/:id/reject", post(reject_inquiry))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            patch(patch_category).delete(delete_category),
        )
        .route("/users", get(list_users))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(read_all_notifications))
        .route("/events", get(audit_events))
}

fn parse_aggregate_id(id: &str, what: &'static str) -> Result<AggregateId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}

/// Suspensions always carry a reason; the store treats it as optional but
/// the moderation form does not.
fn required_reason(reason: Option<String>) -> Result<String, axum::response::Response> {
    match reason.map(|r| r.trim().to_string()) {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "a non-empty reason is required",
        )),
    }
}

// ── Suppliers ────────────────────────────────────────────────────────────────

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::StatusQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let suppliers = &services.projections().suppliers;
    let records = match query.status.as_deref() {
        Some(status) => match errors::parse_supplier_status(status) {
            Ok(status) => suppliers.list_by_status(status),
            Err(resp) => return resp,
        },
        None => suppliers.list(),
    };

    let items = records
        .into_iter()
        .map(dto::supplier_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn dispatch_supplier(
    services: &AppServices,
    principal: &PrincipalContext,
    supplier_id: SupplierId,
    command: SupplierCommand,
) -> axum::response::Response {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![Permission::new("moderation.suppliers")],
    };
    if let Err(e) = crate::authz::authorize_command(principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<SupplierProfile>(
        supplier_id.0,
        streams::SUPPLIER,
        cmd_auth.inner,
        |agg| SupplierProfile::empty(SupplierId::new(agg)),
    ) {
        Ok(_) => {
            let status = services
                .projections()
                .suppliers
                .get(&supplier_id)
                .map(|r| r.status.as_str());
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": supplier_id.to_string(),
                    "status": status,
                })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn approve_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Approve(ApproveProfile {
            supplier_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn reject_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Reject(RejectProfile {
            supplier_id,
            actor: principal.user_id(),
            reason: body.reason,
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn suspend_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspendRequest>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };
    let reason = match required_reason(body.reason) {
        Ok(reason) => reason,
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Suspend(SuspendProfile {
            supplier_id,
            actor: principal.user_id(),
            reason: Some(reason),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn activate_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Activate(ActivateProfile {
            supplier_id,
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Delete(DeleteProfile {
            supplier_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn restore_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supplier_id = match parse_aggregate_id(&id, "supplier") {
        Ok(agg) => SupplierId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_supplier(
        &services,
        &principal,
        supplier_id,
        SupplierCommand::Restore(RestoreProfile {
            supplier_id,
            occurred_at: Utc::now(),
        }),
    )
}

// ── Buyers ───────────────────────────────────────────────────────────────────

pub async fn list_buyers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let items = services
        .projections()
        .buyers
        .list()
        .into_iter()
        .map(dto::buyer_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn dispatch_buyer(
    services: &AppServices,
    principal: &PrincipalContext,
    buyer_id: BuyerId,
    command: BuyerCommand,
) -> axum::response::Response {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![Permission::new("moderation.buyers")],
    };
    if let Err(e) = crate::authz::authorize_command(principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<BuyerProfile>(buyer_id.0, streams::BUYER, cmd_auth.inner, |agg| {
        BuyerProfile::empty(BuyerId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn suspend_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspendRequest>,
) -> axum::response::Response {
    let buyer_id = match parse_aggregate_id(&id, "buyer") {
        Ok(agg) => BuyerId::new(agg),
        Err(resp) => return resp,
    };
    let reason = match required_reason(body.reason) {
        Ok(reason) => reason,
        Err(resp) => return resp,
    };

    dispatch_buyer(
        &services,
        &principal,
        buyer_id,
        BuyerCommand::Suspend(SuspendBuyer {
            buyer_id,
            actor: principal.user_id(),
            reason: Some(reason),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn activate_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let buyer_id = match parse_aggregate_id(&id, "buyer") {
        Ok(agg) => BuyerId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_buyer(
        &services,
        &principal,
        buyer_id,
        BuyerCommand::Activate(ActivateBuyer {
            buyer_id,
            occurred_at: Utc::now(),
        }),
    )
}

/// Hard delete. The registered ownership edges remove the buyer's saved
/// products, followed suppliers, inquiry records, and notifications when the
/// deletion event reaches the cascade subscriber.
pub async fn delete_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let buyer_id = match parse_aggregate_id(&id, "buyer") {
        Ok(agg) => BuyerId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_buyer(
        &services,
        &principal,
        buyer_id,
        BuyerCommand::Delete(DeleteBuyer {
            buyer_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

// ── Products ─────────────────────────────────────────────────────────────────

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::StatusQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let products = &services.projections().products;
    let records = match query.status.as_deref() {
        Some(status) => match errors::parse_product_status(status) {
            Ok(status) => products.list_by_status(status),
            Err(resp) => return resp,
        },
        None => products.list(),
    };

    let items = records
        .into_iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn dispatch_product(
    services: &AppServices,
    principal: &PrincipalContext,
    product_id: ProductId,
    command: ProductCommand,
) -> axum::response::Response {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![Permission::new("moderation.products")],
    };
    if let Err(e) = crate::authz::authorize_command(principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Product>(product_id.0, streams::PRODUCT, cmd_auth.inner, |agg| {
        Product::empty(ProductId::new(agg))
    }) {
        Ok(_) => {
            let status = services
                .projections()
                .products
                .get(&product_id)
                .map(|r| r.status.as_str());
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": product_id.to_string(),
                    "status": status,
                })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn approve_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReviewRequest>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_product(
        &services,
        &principal,
        product_id,
        ProductCommand::Approve(ApproveProduct {
            product_id,
            actor: principal.user_id(),
            notes: body.notes,
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn reject_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectProductRequest>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_product(
        &services,
        &principal,
        product_id,
        ProductCommand::Reject(RejectProduct {
            product_id,
            actor: principal.user_id(),
            reason: body.reason,
            notes: body.notes,
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn suspend_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspendRequest>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_product(
        &services,
        &principal,
        product_id,
        ProductCommand::Suspend(SuspendProduct {
            product_id,
            actor: principal.user_id(),
            reason: body.reason,
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn reinstate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_product(
        &services,
        &principal,
        product_id,
        ProductCommand::Reinstate(ReinstateProduct {
            product_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn restore_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_product(
        &services,
        &principal,
        product_id,
        ProductCommand::Restore(RestoreProduct {
            product_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

/// Hard delete. The only operation that decrements the category counter.
pub async fn purge_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_aggregate_id(&id, "product") {
        Ok(agg) => ProductId::new(agg),
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: ProductCommand::Purge(PurgeProduct {
            product_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("moderation.products")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Product>(product_id.0, streams::PRODUCT, cmd_auth.inner, |agg| {
        Product::empty(ProductId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

// ── Inquiries ────────────────────────────────────────────────────────────────

pub async fn list_pending_inquiries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let projections = services.projections();
    let items = projections
        .board
        .list_pending_approval()
        .into_iter()
        .map(|record| dto::inquiry_to_json(enrich_inquiry(projections, record)))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn list_approved_inquiries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let projections = services.projections();
    let items = projections
        .board
        .list_approved()
        .into_iter()
        .map(|record| dto::inquiry_to_json(enrich_inquiry(projections, record)))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn dispatch_inquiry(
    services: &AppServices,
    principal: &PrincipalContext,
    inquiry_id: InquiryId,
    command: InquiryCommand,
) -> axum::response::Response {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![Permission::new("moderation.inquiries")],
    };
    if let Err(e) = crate::authz::authorize_command(principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Inquiry>(inquiry_id.0, streams::INQUIRY, cmd_auth.inner, |agg| {
        Inquiry::empty(InquiryId::new(agg))
    }) {
        Ok(_) => {
            let approval = services
                .projections()
                .board
                .get(&inquiry_id)
                .map(|r| r.approval.as_str());
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": inquiry_id.to_string(),
                    "admin_approval_status": approval,
                })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn approve_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let inquiry_id = match parse_aggregate_id(&id, "inquiry") {
        Ok(agg) => InquiryId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_inquiry(
        &services,
        &principal,
        inquiry_id,
        InquiryCommand::Approve(ApproveInquiry {
            inquiry_id,
            actor: principal.user_id(),
            occurred_at: Utc::now(),
        }),
    )
}

pub async fn reject_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    let inquiry_id = match parse_aggregate_id(&id, "inquiry") {
        Ok(agg) => InquiryId::new(agg),
        Err(resp) => return resp,
    };

    dispatch_inquiry(
        &services,
        &principal,
        inquiry_id,
        InquiryCommand::Reject(RejectInquiry {
            inquiry_id,
            actor: principal.user_id(),
            reason: body.reason,
            occurred_at: Utc::now(),
        }),
    )
}

// ── Categories ───────────────────────────────────────────────────────────────

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    // The admin console sees inactive categories too.
    let items = services
        .projections()
        .categories
        .list_all()
        .iter()
        .map(dto::category_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    match services
        .projections()
        .categories
        .create(body.name, body.parent_id.map(CategoryId::from_uuid))
    {
        Ok(category) => {
            (StatusCode::CREATED, Json(dto::category_to_json(&category))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn patch_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PatchCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let category_id = match uuid::Uuid::parse_str(&id) {
        Ok(uuid) => CategoryId::from_uuid(uuid),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid category id",
            );
        }
    };

    let categories = &services.projections().categories;
    if let Some(name) = body.name {
        if let Err(e) = categories.rename(category_id, name) {
            return errors::domain_error_to_response(e);
        }
    }
    if let Some(parent_id) = body.parent_id {
        if let Err(e) = categories.set_parent(category_id, Some(CategoryId::from_uuid(parent_id))) {
            return errors::domain_error_to_response(e);
        }
    }
    if let Some(active) = body.active {
        if let Err(e) = categories.set_active(category_id, active) {
            return errors::domain_error_to_response(e);
        }
    }

    match categories.get(&category_id) {
        Some(category) => (StatusCode::OK, Json(dto::category_to_json(&category))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "category not found"),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let category_id = match uuid::Uuid::parse_str(&id) {
        Ok(uuid) => CategoryId::from_uuid(uuid),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid category id",
            );
        }
    };

    match services.projections().categories.delete(category_id) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "outcome": outcome,
                "deleted": outcome == tradepost_catalog::CategoryDeletion::Removed,
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── Users, notifications, audit ──────────────────────────────────────────────

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let items = services
        .projections()
        .accounts
        .list()
        .into_iter()
        .map(dto::account_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Remove an account. The ownership cascade drops the attached supplier or
/// buyer profile when the deletion event lands.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match parse_aggregate_id(&id, "user") {
        Ok(agg) => tradepost_core::UserId::from(agg),
        Err(resp) => return resp,
    };

    // The operator account is seeded, not managed through this console.
    if let Some(account) = services.projections().accounts.get(&user_id) {
        if account.role.is_admin() {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invariant_violation",
                "admin accounts cannot be deleted",
            );
        }
    }

    let cmd_auth = CmdAuth {
        inner: tradepost_identity::AccountCommand::Delete(tradepost_identity::DeleteAccount {
            user_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("moderation.users")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<tradepost_identity::Account>(
        user_id.into(),
        streams::ACCOUNT,
        cmd_auth.inner,
        |agg| tradepost_identity::Account::empty(tradepost_core::UserId::from(agg)),
    ) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let items = services
        .projections()
        .admin_feed
        .list()
        .into_iter()
        .map(dto::admin_notification_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn read_all_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let marked = services.projections().admin_feed.mark_all_read();
    (StatusCode::OK, Json(serde_json::json!({ "marked": marked }))).into_response()
}

/// Moderation audit: every stored event, filterable by aggregate, event
/// type, and time range.
pub async fn audit_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::EventAuditQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Admin) {
        return resp;
    }

    let filter = EventFilter {
        aggregate_id: query.aggregate_id.map(AggregateId::from_uuid),
        aggregate_type: query.aggregate_type,
        event_type: query.event_type,
        occurred_after: query.occurred_after,
        occurred_before: query.occurred_before,
    };
    let pagination = Pagination::new(query.limit, query.offset);

    match services.query_events(filter, pagination).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}
