use axum::http::StatusCode;

use tradepost_auth::{CommandAuthorization, Permission, Role};
use tradepost_infra::projections::{EnrichedInquiry, InquiryRecord};

use crate::app::errors;
use crate::app::services::Projections;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Gate a read-side handler on the caller's role.
pub fn require_role(
    principal: &PrincipalContext,
    role: Role,
) -> Result<(), axum::response::Response> {
    if principal.role() == role {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("requires the {} role", role.as_str()),
        ))
    }
}

/// Join an inquiry with display names, recomputed per request against the
/// live read models (never materialized, so never stale).
pub fn enrich_inquiry(projections: &Projections, record: InquiryRecord) -> EnrichedInquiry {
    let buyer_company = projections
        .buyers
        .get(&record.buyer_id)
        .and_then(|b| b.company_name);
    let supplier_company = projections
        .suppliers
        .get(&record.supplier_id)
        .map(|s| s.company.company_name)
        .filter(|name| !name.is_empty());
    let product_name = record
        .product_id
        .and_then(|p| projections.products.get(&p))
        .map(|p| p.name);

    EnrichedInquiry::join(record, buyer_company, supplier_company, product_name)
}
