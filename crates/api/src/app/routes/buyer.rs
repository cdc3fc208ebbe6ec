//! Buyer portal: profile, inquiries, saved products, followed suppliers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use tradepost_auth::{Permission, Role};
use tradepost_buyers::{BuyerCommand, BuyerId, BuyerProfile, UpdateBuyerDetails};
use tradepost_catalog::{ProductId, ProductStatus};
use tradepost_core::AggregateId;
use tradepost_infra::streams;
use tradepost_inquiries::{Inquiry, InquiryCommand, InquiryId, ReplyAsBuyer, SubmitInquiry};
use tradepost_suppliers::SupplierId;

use crate::app::routes::common::{CmdAuth, enrich_inquiry, require_role};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/inquiries", post(create_inquiry).get(list_inquiries))
        .route("/inquiries/:id/reply", post(reply_inquiry))
        .route("/saved-products", get(list_saved_products))
        .route(
            "/saved-products/:product_id",
            post(save_product).delete(unsave_product),
        )
        .route("/followed-suppliers", get(list_followed_suppliers))
        .route(
            "/followed-suppliers/:supplier_id",
            post(follow_supplier).delete(unfollow_supplier),
        )
}

fn own_buyer_id(principal: &PrincipalContext) -> BuyerId {
    BuyerId::from(principal.user_id())
}

pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    match services.projections().buyers.by_user(principal.user_id()) {
        Some(record) => (StatusCode::OK, Json(dto::buyer_to_json(record))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "profile not found"),
    }
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::BuyerProfileRequest>,
) -> axum::response::Response {
    let buyer_id = own_buyer_id(&principal);

    let cmd_auth = CmdAuth {
        inner: BuyerCommand::UpdateDetails(UpdateBuyerDetails {
            buyer_id,
            company_name: body.company_name,
            contact_email: body.contact_email,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("profile.manage_own")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<BuyerProfile>(buyer_id.0, streams::BUYER, cmd_auth.inner, |agg| {
        BuyerProfile::empty(BuyerId::new(agg))
    }) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn create_inquiry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateInquiryRequest>,
) -> axum::response::Response {
    let buyer_id = own_buyer_id(&principal);
    let projections = services.projections();

    // A suspended buyer cannot open new conversations.
    let can_transact = projections
        .buyers
        .get(&buyer_id)
        .is_some_and(|b| b.status == tradepost_buyers::BuyerStatus::Active);
    if !can_transact {
        return errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invariant_violation",
            "buyer profile is not active",
        );
    }

    let supplier_id = SupplierId::from(tradepost_core::UserId::from_uuid(body.supplier_id));
    let supplier_active = projections
        .suppliers
        .get(&supplier_id)
        .is_some_and(|s| s.is_active());
    if !supplier_active {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found");
    }

    // An optional product reference must resolve to a publicly visible
    // listing of that same supplier.
    let product_id = match body.product_id {
        Some(uuid) => {
            let product_id = ProductId::new(AggregateId::from_uuid(uuid));
            let valid = projections.products.get(&product_id).is_some_and(|p| {
                p.supplier_id == supplier_id && p.status == ProductStatus::Approved
            });
            if !valid {
                return errors::json_error(
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "product not found",
                );
            }
            Some(product_id)
        }
        None => None,
    };

    let agg = AggregateId::new();
    let inquiry_id = InquiryId::new(agg);
    let cmd_auth = CmdAuth {
        inner: InquiryCommand::Submit(SubmitInquiry {
            inquiry_id,
            buyer_id,
            supplier_id,
            product_id,
            subject: body.subject,
            message: body.message,
            occurred_at: Utc::now(),
        }),
        required: vec![Permission::new("inquiries.submit")],
    };
    if let Err(e) = crate::authz::authorize_command(&principal, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    match services.dispatch::<Inquiry>(agg, streams::INQUIRY, cmd_auth.inner, |agg| {
        Inquiry::empty(InquiryId::new(agg))
    }) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": inquiry_id.to_string(),
                "admin_approval_status": "pending",
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_inquiries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let projections = services.projections();
    let items = projections
        .board
        .list_for_buyer(own_buyer_id(&principal))
        .into_iter()
        .map(|record| dto::inquiry_to_json(enrich_inquiry(projections, record)))
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Resolve an inquiry id and check the caller opened it.
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
        Some(record) if record.buyer_id == BuyerId::from(principal.user_id()) => Ok(inquiry_id),
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
        inner: InquiryCommand::ReplyAsBuyer(ReplyAsBuyer {
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

// ── Saved products / followed suppliers ──────────────────────────────────────
//
// Buyer personalization records are plain read-model rows, not aggregates:
// they have no lifecycle beyond existing, so they skip the dispatcher and
// write the library store directly.

pub async fn list_saved_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let items = services
        .projections()
        .library
        .saved_for(own_buyer_id(&principal))
        .into_iter()
        .map(dto::saved_product_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn save_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let product_id = match product_id.parse::<AggregateId>() {
        Ok(agg) => ProductId::new(agg),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    let projections = services.projections();
    let visible = projections
        .products
        .get(&product_id)
        .is_some_and(|p| p.status == ProductStatus::Approved);
    if !visible {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
    }

    projections
        .library
        .save_product(own_buyer_id(&principal), product_id, Utc::now());
    StatusCode::OK.into_response()
}

pub async fn unsave_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let product_id = match product_id.parse::<AggregateId>() {
        Ok(agg) => ProductId::new(agg),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    if services
        .projections()
        .library
        .unsave_product(own_buyer_id(&principal), product_id)
    {
        StatusCode::OK.into_response()
    } else {
        errors::json_error(StatusCode::NOT_FOUND, "not_found", "saved product not found")
    }
}

pub async fn list_followed_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let items = services
        .projections()
        .library
        .followed_for(own_buyer_id(&principal))
        .into_iter()
        .map(dto::followed_supplier_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn follow_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(supplier_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let supplier_id = match supplier_id.parse::<AggregateId>() {
        Ok(agg) => SupplierId::new(agg),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid supplier id",
            );
        }
    };

    let projections = services.projections();
    let active = projections
        .suppliers
        .get(&supplier_id)
        .is_some_and(|s| s.is_active());
    if !active {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found");
    }

    projections
        .library
        .follow_supplier(own_buyer_id(&principal), supplier_id, Utc::now());
    StatusCode::OK.into_response()
}

pub async fn unfollow_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(supplier_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&principal, Role::Buyer) {
        return resp;
    }

    let supplier_id = match supplier_id.parse::<AggregateId>() {
        Ok(agg) => SupplierId::new(agg),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid supplier id",
            );
        }
    };

    if services
        .projections()
        .library
        .unfollow_supplier(own_buyer_id(&principal), supplier_id)
    {
        StatusCode::OK.into_response()
    } else {
        errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "followed supplier not found",
        )
    }
}
