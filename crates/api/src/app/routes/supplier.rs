//! Supplier portal: onboarding, own catalog, own inquiry inbox.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use chrono::Utc;

use tradepost_auth::{Permission, Role};
use tradepost_catalog::{
    CategoryId, CreateProduct, DeleteProduct, Product, ProductCommand, ProductId, ProductPatch,
    RecoverProduct, SubmitProduct, UpdateProduct,
};
use tradepost_core::AggregateId;
use tradepost_infra::streams;
use tradepost_inquiries::{
    DeleteInquiry, Inquiry, InquiryCommand, InquiryId, RecoverInquiry, ReplyAsSupplier,
};
use tradepost_suppliers::{
    SaveOnboardingDraft, SubmitOnboarding, SupplierCommand, SupplierId, SupplierProfile,
};

use crate::app::routes::common::{CmdAuth, enrich_inquiry, require_role};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/onboarding/draft", put(save_onboarding_draft))
        .route("/onboarding/submit", post(submit_onboarding))
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", patch(update_product))
        .route("/products/:id/submit", post(submit_product))
        .route("/products/:id/delete", post(delete_product))
        .route("/products/:id/recover", post(recover_product))
        .route("/inquiries", get(list_inquiries))
        .route("/inquiries/:id/reply", post(reply_inquiry))
        .route("/inquiries/:id/delete", post(delete_inquiry))
        .route("/inquiries/:id/recover", post(recover_inquiry))
}

fn own_supplier_id(principal: &PrincipalContext) -> SupplierId {
    SupplierId::from(principal.user_id())
}

pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Supplier) {
        return resp;
    }

    match services.projections().suppliers.by_user(principal.user_id()) {
        Some(record) => (StatusCode::OK, Json(dto::supplier_to_json(record))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "profile not found"),
    }
}

pub async fn save_onboarding_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::OnboardingDraftRequest>,
) -> axum::response::Response {
    let supplier_id = own_supplier_id(&principal);

    let cmd_auth = CmdAuth {
        inner: SupplierCommand::SaveDraft(SaveOnboardingDraft {
            supplier_id,
            draft: body.draft,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("profile.manage_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<SupplierProfile>(
        supplier_id.0,
        streams::SUPPLIER,
        cmd_auth.inner,
        |agg| SupplierProfile::empty(SupplierId::new(agg)),
    ) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn submit_onboarding(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::OnboardingSubmitRequest>,
) -> axum::response::Response {
    let supplier_id = own_supplier_id(&principal);

    let cmd_auth = CmdAuth {
        inner: SupplierCommand::SubmitOnboarding(SubmitOnboarding {
            supplier_id,
            company: body.company,
            contact: body.contact,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("profile.manage_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<SupplierProfile>(
        supplier_id.0,
        streams::SUPPLIER,
        cmd_auth.inner,
        |agg| SupplierProfile::empty(SupplierId::new(agg)),
    ) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "pending_approval" })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Supplier) {
        return resp;
    }

    let items = services
        .projections()
        .products
        .list_for_supplier(own_supplier_id(&principal))
        .into_iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let supplier_id = own_supplier_id(&principal);

    // Only an approved (active) supplier may list products.
    let supplier_active = services
        .projections()
        .suppliers
        .get(&supplier_id)
        .is_some_and(|s| s.is_active());
    if !supplier_active {
        return errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invariant_violation",
            "supplier profile is not active",
        );
    }

    if let Some(category_id) = body.category_id {
        let known = services
            .projections()
            .categories
            .get(&CategoryId::from_uuid(category_id))
            .is_some();
        if !known {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "unknown category",
            );
        }
    }

    let agg = AggregateId::new();
    let product_id = ProductId::new(agg);
    let cmd_auth = CmdAuth {
        inner: ProductCommand::Create(CreateProduct {
            product_id,
            supplier_id,
            category_id: body.category_id.map(CategoryId::from_uuid),
            name: body.name,
            description: body.description,
            pricing: body.pricing,
            submit_for_review: body.submit_for_review,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("catalog.manage_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Product>(agg, streams::PRODUCT, cmd_auth.inner, |agg| {
        Product::empty(ProductId::new(agg))
    }) {
        Ok(committed) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Resolve a product id from the path and check the caller owns it.
///
/// Unowned products answer 404 rather than 403 so suppliers cannot probe
/// each other's catalogs.
fn owned_product(
    services: &AppServices,
    principal: &PrincipalContext,
    id: &str,
) -> Result<ProductId, axum::response::Response> {
    let agg: AggregateId = id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
    })?;
    let product_id = ProductId::new(agg);

    match services.projections().products.get(&product_id) {
        Some(record) if record.supplier_id == SupplierId::from(principal.user_id()) => {
            Ok(product_id)
        }
        _ => Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "product not found",
        )),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let product_id = match owned_product(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Some(category_id) = body.category_id {
        let known = services
            .projections()
            .categories
            .get(&CategoryId::from_uuid(category_id))
            .is_some();
        if !known {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "unknown category",
            );
        }
    }

    let patch = ProductPatch {
        name: body.name,
        description: body.description,
        category_id: body.category_id.map(|c| Some(CategoryId::from_uuid(c))),
        pricing: body.pricing,
    };

    let cmd_auth = CmdAuth {
        inner: ProductCommand::Update(UpdateProduct {
            product_id,
            patch,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("catalog.manage_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Product>(product_id.0, streams::PRODUCT, cmd_auth.inner, |agg| {
        Product::empty(ProductId::new(agg))
    }) {
        // An edit to a live product re-enters review; report the status the
        // caller will observe.
        Ok(_) => {
            let status = services
                .projections()
                .products
                .get(&product_id)
                .map(|r| r.status.as_str())
                .unwrap_or("pending");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "id": product_id.to_string(), "status": status })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn submit_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match owned_product(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: ProductCommand::Submit(SubmitProduct {
            product_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("catalog.manage_own")],
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

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match owned_product(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: ProductCommand::Delete(DeleteProduct {
            product_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("catalog.manage_own")],
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

pub async fn recover_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match owned_product(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: ProductCommand::Recover(RecoverProduct {
            product_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("catalog.manage_own")],
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

pub async fn list_inquiries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Supplier) {
        return resp;
    }

    let projections = services.projections();
    let items = projections
        .board
        .list_for_supplier(own_supplier_id(&principal))
        .into_iter()
        .map(|record| dto::inquiry_to_json(enrich_inquiry(projections, record)))
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Resolve an inquiry id and check the caller is the addressed supplier.
fn own_inquiry(
    services: &AppServices,
    principal: &PrincipalContext,
    id: &str,
) -> Result<InquiryId, axum::response::Response> {
    let agg: AggregateId = id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid inquiry id")
    })?;
    let inquiry_id = InquiryId::new(agg);

    match services.projections().board.get(&inquiry_id) {
        Some(record) if record.supplier_id == SupplierId::from(principal.user_id()) => {
            Ok(inquiry_id)
        }
        _ => Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "inquiry not found",
        )),
    }
}

pub async fn reply_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReplyRequest>,
) -> axum::response::Response {
    let inquiry_id = match own_inquiry(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: InquiryCommand::ReplyAsSupplier(ReplyAsSupplier {
            inquiry_id,
            message: body.message,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("inquiries.reply_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Inquiry>(inquiry_id.0, streams::INQUIRY, cmd_auth.inner, |agg| {
        Inquiry::empty(InquiryId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn delete_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let inquiry_id = match own_inquiry(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: InquiryCommand::Delete(DeleteInquiry {
            inquiry_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("inquiries.reply_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Inquiry>(inquiry_id.0, streams::INQUIRY, cmd_auth.inner, |agg| {
        Inquiry::empty(InquiryId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn recover_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let inquiry_id = match own_inquiry(&services, &principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cmd_auth = CmdAuth {
        inner: InquiryCommand::Recover(RecoverInquiry {
            inquiry_id,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("inquiries.reply_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Inquiry>(inquiry_id.0, streams::INQUIRY, cmd_auth.inner, |agg| {
        Inquiry::empty(InquiryId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
