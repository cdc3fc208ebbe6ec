use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tradepost_catalog::ProductStatus;
use tradepost_core::DomainError;
use tradepost_infra::command_dispatcher::DispatchError;
use tradepost_suppliers::SupplierStatus;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::IllegalTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "illegal_transition", msg)
        }
        DispatchError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

/// Mapping for the handful of synchronous (non-dispatched) domain
/// operations, e.g. category administration.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::IllegalTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "illegal_transition", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_supplier_status(s: &str) -> Result<SupplierStatus, axum::response::Response> {
    match s {
        "pending_approval" => Ok(SupplierStatus::PendingApproval),
        "active" => Ok(SupplierStatus::Active),
        "rejected" => Ok(SupplierStatus::Rejected),
        "suspended" => Ok(SupplierStatus::Suspended),
        "deleted" => Ok(SupplierStatus::Deleted),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending_approval, active, rejected, suspended, deleted",
        )),
    }
}

pub fn parse_product_status(s: &str) -> Result<ProductStatus, axum::response::Response> {
    match s {
        "draft" => Ok(ProductStatus::Draft),
        "pending" => Ok(ProductStatus::Pending),
        "approved" => Ok(ProductStatus::Approved),
        "rejected" => Ok(ProductStatus::Rejected),
        "suspended" => Ok(ProductStatus::Suspended),
        "deleted" => Ok(ProductStatus::Deleted),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: draft, pending, approved, rejected, suspended, deleted",
        )),
    }
}
