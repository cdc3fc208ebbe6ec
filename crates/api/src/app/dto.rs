//! Request DTOs and JSON mapping helpers shared by the route modules.

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use tradepost_catalog::{Category, PricingMetadata};
use tradepost_infra::projections::{
    AccountRecord, BuyerRecord, EnrichedInquiry, ProductRecord, SupplierRecord,
};
use tradepost_infra::projections::library::{FollowedSupplier, SavedProduct};
use tradepost_notifications::{AdminNotification, Notification};
use tradepost_suppliers::{CompanyDetails, ContactInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// "buyer" or "supplier"; admin accounts are seeded, never registered.
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: uuid::Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: uuid::Uuid,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingDraftRequest {
    pub draft: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingSubmitRequest {
    pub company: CompanyDetails,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub pricing: PricingMetadata,
    /// False keeps the product as a draft.
    #[serde(default = "default_true")]
    pub submit_for_review: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<uuid::Uuid>,
    pub pricing: Option<PricingMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct BuyerProfileRequest {
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInquiryRequest {
    pub supplier_id: uuid::Uuid,
    pub product_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectProductRequest {
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<uuid::Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Query parameters for the moderation audit endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct EventAuditQuery {
    pub aggregate_id: Option<uuid::Uuid>,
    pub aggregate_type: Option<String>,
    pub event_type: Option<String>,
    pub occurred_after: Option<chrono::DateTime<chrono::Utc>>,
    pub occurred_before: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchCategoryRequest {
    pub name: Option<String>,
    pub parent_id: Option<uuid::Uuid>,
    pub active: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON mapping
// ─────────────────────────────────────────────────────────────────────────────

pub fn supplier_to_json(r: SupplierRecord) -> JsonValue {
    json!({
        "id": r.supplier_id.to_string(),
        "user_id": r.user_id.to_string(),
        "company": {
            "company_name": r.company.company_name,
            "business_registration": r.company.business_registration,
            "legal_entity_type": r.company.legal_entity_type,
            "address": r.company.address,
            "website": r.company.website,
        },
        "contact": {
            "email": r.contact.email,
            "phone": r.contact.phone,
        },
        "status": r.status.as_str(),
        "verified": r.verified,
        "rating": r.rating,
        "onboarding_completed": r.onboarding_completed,
        "rejection_reason": r.rejection_reason,
        "suspension_reason": r.suspension_reason,
        "created_at": r.created_at,
        "updated_at": r.updated_at,
    })
}

pub fn buyer_to_json(r: BuyerRecord) -> JsonValue {
    json!({
        "id": r.buyer_id.to_string(),
        "user_id": r.user_id.to_string(),
        "company_name": r.company_name,
        "contact_email": r.contact_email,
        "status": r.status.as_str(),
        "suspension_reason": r.suspension_reason,
        "created_at": r.created_at,
        "updated_at": r.updated_at,
    })
}

pub fn product_to_json(r: ProductRecord) -> JsonValue {
    json!({
        "id": r.product_id.to_string(),
        "supplier_id": r.supplier_id.to_string(),
        "category_id": r.category_id.map(|c| c.to_string()),
        "name": r.name,
        "description": r.description,
        "pricing": {
            "base_price": r.pricing.base_price,
            "currency": r.pricing.currency,
            "min_order_quantity": r.pricing.min_order_quantity,
        },
        "status": r.status.as_str(),
        "reviewed_by": r.review.as_ref().map(|s| s.reviewed_by.to_string()),
        "reviewed_at": r.review.as_ref().map(|s| s.reviewed_at),
        "review_notes": r.review.as_ref().and_then(|s| s.notes.clone()),
        "rejection_reason": r.rejection_reason,
        "suspension_reason": r.suspension_reason,
        "view_count": r.view_count,
        "inquiry_count": r.inquiry_count,
        "created_at": r.created_at,
        "updated_at": r.updated_at,
    })
}

pub fn category_to_json(c: &Category) -> JsonValue {
    json!({
        "id": c.id_typed().to_string(),
        "name": c.name(),
        "parent_id": c.parent().map(|p| p.to_string()),
        "active": c.is_active(),
        "product_count": c.product_count(),
    })
}

pub fn inquiry_to_json(e: EnrichedInquiry) -> JsonValue {
    let r = e.inquiry;
    json!({
        "id": r.inquiry_id.to_string(),
        "buyer_id": r.buyer_id.to_string(),
        "buyer_company": e.buyer_company,
        "supplier_id": r.supplier_id.to_string(),
        "supplier_company": e.supplier_company,
        "product_id": r.product_id.map(|p| p.to_string()),
        "product_name": e.product_name,
        "subject": r.subject,
        "message": r.message,
        "status": r.conversation.as_str(),
        "admin_approval_status": r.approval.as_str(),
        "supplier_reply": r.supplier_reply.as_ref().map(|reply| reply.message.clone()),
        "supplier_replied_at": r.supplier_reply.as_ref().map(|reply| reply.at),
        "buyer_reply": r.buyer_reply.as_ref().map(|reply| reply.message.clone()),
        "buyer_replied_at": r.buyer_reply.as_ref().map(|reply| reply.at),
        "rejection_reason": r.rejection_reason,
        "submitted_at": r.submitted_at,
        "updated_at": r.updated_at,
    })
}

pub fn notification_to_json(n: Notification) -> JsonValue {
    json!({
        "id": n.id.to_string(),
        "type": n.kind.as_str(),
        "message": n.message,
        "link": n.link,
        "read": n.read,
        "created_at": n.created_at,
    })
}

pub fn admin_notification_to_json(n: AdminNotification) -> JsonValue {
    json!({
        "id": n.id.to_string(),
        "type": n.kind.as_str(),
        "message": n.message,
        "subject_id": n.subject_id.to_string(),
        "read": n.read,
        "created_at": n.created_at,
    })
}

/// Admin user listing; the password hash never leaves the process.
pub fn account_to_json(r: AccountRecord) -> JsonValue {
    json!({
        "id": r.user_id.to_string(),
        "email": r.email,
        "role": r.role.as_str(),
        "approved": r.approved,
        "email_verified": r.email_verified,
        "registered_at": r.registered_at,
    })
}

pub fn saved_product_to_json(s: SavedProduct) -> JsonValue {
    json!({
        "product_id": s.product_id.to_string(),
        "saved_at": s.saved_at,
    })
}

pub fn followed_supplier_to_json(f: FollowedSupplier) -> JsonValue {
    json!({
        "supplier_id": f.supplier_id.to_string(),
        "followed_at": f.followed_at,
    })
}
