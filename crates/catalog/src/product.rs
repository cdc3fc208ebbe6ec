use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use tradepost_events::Event;
use tradepost_suppliers::SupplierId;

use crate::category::CategoryId;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Product moderation lifecycle.
///
/// ```text
/// Draft → Pending → { Approved, Rejected }
/// Approved ⇄ Suspended
/// Rejected → Pending            (admin restore)
/// any non-deleted → Deleted     (owning supplier, soft) → Pending (recover)
/// ```
///
/// Editing an approved product resets it to Pending so unreviewed content
/// never reaches the public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Suspended,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Pending => "pending",
            ProductStatus::Approved => "approved",
            ProductStatus::Rejected => "rejected",
            ProductStatus::Suspended => "suspended",
            ProductStatus::Deleted => "deleted",
        }
    }
}

/// Optional pricing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PricingMetadata {
    /// Price in smallest currency unit (e.g., cents).
    pub base_price: Option<u64>,
    /// ISO currency code (e.g., "USD", "EUR").
    pub currency: Option<String>,
    pub min_order_quantity: Option<u32>,
}

/// Review decision metadata (admin approve/reject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub reviewed_by: UserId,
    pub reviewed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Supplier-facing edit payload. `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Option<CategoryId>>,
    pub pricing: Option<PricingMetadata>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.pricing.is_none()
    }
}

/// Aggregate root: product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    supplier_id: SupplierId,
    category_id: Option<CategoryId>,
    name: String,
    description: String,
    pricing: PricingMetadata,
    status: ProductStatus,
    review: Option<ReviewStamp>,
    rejection_reason: Option<String>,
    suspension_reason: Option<String>,
    version: u64,
    created: bool,
    purged: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            supplier_id: SupplierId::new(AggregateId::from_uuid(uuid::Uuid::nil())),
            category_id: None,
            name: String::new(),
            description: String::new(),
            pricing: PricingMetadata::default(),
            status: ProductStatus::Draft,
            review: None,
            rejection_reason: None,
            suspension_reason: None,
            version: 0,
            created: false,
            purged: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pricing(&self) -> &PricingMetadata {
        &self.pricing
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn review(&self) -> Option<&ReviewStamp> {
        self.review.as_ref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn suspension_reason(&self) -> Option<&str> {
        self.suspension_reason.as_deref()
    }

    /// Only approved products are visible in public listings.
    pub fn is_publicly_visible(&self) -> bool {
        self.status == ProductStatus::Approved
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: create a product, either as a draft or straight into review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub pricing: PricingMetadata,
    /// False → Draft, true → Pending (submitted for review immediately).
    pub submit_for_review: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: submit a draft for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub patch: ProductPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin rejection (reason required).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub reason: String,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin suspension of a live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: lift a suspension (back to Approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinstateProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin restore of a rejected product back into the review queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier soft delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier recovery of a soft-deleted product (re-enters review).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin hard delete. Removes the record from read models and
/// decrements the category counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeProduct {
    pub product_id: ProductId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    Create(CreateProduct),
    Submit(SubmitProduct),
    Update(UpdateProduct),
    Approve(ApproveProduct),
    Reject(RejectProduct),
    Suspend(SuspendProduct),
    Reinstate(ReinstateProduct),
    Restore(RestoreProduct),
    Delete(DeleteProduct),
    Recover(RecoverProduct),
    Purge(PurgeProduct),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub pricing: PricingMetadata,
    pub status: ProductStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSubmitted {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub patch: ProductPatch,
    /// True when the edit knocked an approved product back to Pending.
    pub review_reset: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductApproved {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRejected {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: String,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSuspended {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReinstated {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRestored {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecovered {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPurged {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub category_id: Option<CategoryId>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    Created(ProductCreated),
    Submitted(ProductSubmitted),
    Updated(ProductUpdated),
    Approved(ProductApproved),
    Rejected(ProductRejected),
    Suspended(ProductSuspended),
    Reinstated(ProductReinstated),
    Restored(ProductRestored),
    Deleted(ProductDeleted),
    Recovered(ProductRecovered),
    Purged(ProductPurged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => "catalog.product.created",
            ProductEvent::Submitted(_) => "catalog.product.submitted",
            ProductEvent::Updated(_) => "catalog.product.updated",
            ProductEvent::Approved(_) => "catalog.product.approved",
            ProductEvent::Rejected(_) => "catalog.product.rejected",
            ProductEvent::Suspended(_) => "catalog.product.suspended",
            ProductEvent::Reinstated(_) => "catalog.product.reinstated",
            ProductEvent::Restored(_) => "catalog.product.restored",
            ProductEvent::Deleted(_) => "catalog.product.deleted",
            ProductEvent::Recovered(_) => "catalog.product.recovered",
            ProductEvent::Purged(_) => "catalog.product.purged",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created(e) => e.occurred_at,
            ProductEvent::Submitted(e) => e.occurred_at,
            ProductEvent::Updated(e) => e.occurred_at,
            ProductEvent::Approved(e) => e.occurred_at,
            ProductEvent::Rejected(e) => e.occurred_at,
            ProductEvent::Suspended(e) => e.occurred_at,
            ProductEvent::Reinstated(e) => e.occurred_at,
            ProductEvent::Restored(e) => e.occurred_at,
            ProductEvent::Deleted(e) => e.occurred_at,
            ProductEvent::Recovered(e) => e.occurred_at,
            ProductEvent::Purged(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::Created(e) => {
                self.id = e.product_id;
                self.supplier_id = e.supplier_id;
                self.category_id = e.category_id;
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.pricing = e.pricing.clone();
                self.status = e.status;
                self.created = true;
            }
            ProductEvent::Submitted(_) => {
                self.status = ProductStatus::Pending;
            }
            ProductEvent::Updated(e) => {
                if let Some(name) = &e.patch.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.patch.description {
                    self.description = description.clone();
                }
                if let Some(category_id) = &e.patch.category_id {
                    self.category_id = *category_id;
                }
                if let Some(pricing) = &e.patch.pricing {
                    self.pricing = pricing.clone();
                }
                if e.review_reset {
                    self.status = ProductStatus::Pending;
                    self.review = None;
                }
            }
            ProductEvent::Approved(e) => {
                self.status = ProductStatus::Approved;
                self.review = Some(ReviewStamp {
                    reviewed_by: e.actor,
                    reviewed_at: e.occurred_at,
                    notes: e.notes.clone(),
                });
                self.rejection_reason = None;
            }
            ProductEvent::Rejected(e) => {
                self.status = ProductStatus::Rejected;
                self.review = Some(ReviewStamp {
                    reviewed_by: e.actor,
                    reviewed_at: e.occurred_at,
                    notes: e.notes.clone(),
                });
                self.rejection_reason = Some(e.reason.clone());
            }
            ProductEvent::Suspended(e) => {
                self.status = ProductStatus::Suspended;
                self.suspension_reason = e.reason.clone();
            }
            ProductEvent::Reinstated(_) => {
                self.status = ProductStatus::Approved;
                self.suspension_reason = None;
            }
            ProductEvent::Restored(_) => {
                self.status = ProductStatus::Pending;
                self.rejection_reason = None;
                self.review = None;
            }
            ProductEvent::Deleted(_) => {
                self.status = ProductStatus::Deleted;
            }
            ProductEvent::Recovered(_) => {
                self.status = ProductStatus::Pending;
                self.review = None;
            }
            ProductEvent::Purged(_) => {
                self.purged = true;
                self.status = ProductStatus::Deleted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::Create(cmd) => self.handle_create(cmd),
            ProductCommand::Submit(cmd) => self.handle_submit(cmd),
            ProductCommand::Update(cmd) => self.handle_update(cmd),
            ProductCommand::Approve(cmd) => self.handle_approve(cmd),
            ProductCommand::Reject(cmd) => self.handle_reject(cmd),
            ProductCommand::Suspend(cmd) => self.handle_suspend(cmd),
            ProductCommand::Reinstate(cmd) => self.handle_reinstate(cmd),
            ProductCommand::Restore(cmd) => self.handle_restore(cmd),
            ProductCommand::Delete(cmd) => self.handle_delete(cmd),
            ProductCommand::Recover(cmd) => self.handle_recover(cmd),
            ProductCommand::Purge(cmd) => self.handle_purge(cmd),
        }
    }
}

impl Product {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.purged {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_not_deleted(&self) -> Result<(), DomainError> {
        self.ensure_live()?;
        if self.status == ProductStatus::Deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }

        let status = if cmd.submit_for_review {
            ProductStatus::Pending
        } else {
            ProductStatus::Draft
        };

        Ok(vec![ProductEvent::Created(ProductCreated {
            product_id: cmd.product_id,
            supplier_id: cmd.supplier_id,
            category_id: cmd.category_id,
            name: cmd.name.trim().to_string(),
            description: cmd.description.clone(),
            pricing: cmd.pricing.clone(),
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if self.status != ProductStatus::Draft {
            return Err(DomainError::illegal_transition(format!(
                "only drafts can be submitted (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Submitted(ProductSubmitted {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if cmd.patch.is_empty() {
            return Err(DomainError::validation("empty update"));
        }
        if let Some(name) = &cmd.patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
        }

        // An edit to a live product re-enters review; drafts and pending
        // products keep their state, rejected/suspended stay with the admin.
        let review_reset = self.status == ProductStatus::Approved;

        Ok(vec![ProductEvent::Updated(ProductUpdated {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            patch: cmd.patch.clone(),
            review_reset,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if self.status != ProductStatus::Pending {
            return Err(DomainError::illegal_transition(format!(
                "only pending products can be approved (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Approved(ProductApproved {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            actor: cmd.actor,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("rejection reason cannot be empty"));
        }
        if self.status != ProductStatus::Pending {
            return Err(DomainError::illegal_transition(format!(
                "only pending products can be rejected (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Rejected(ProductRejected {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if self.status != ProductStatus::Approved {
            return Err(DomainError::illegal_transition(format!(
                "only approved products can be suspended (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Suspended(ProductSuspended {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reinstate(&self, cmd: &ReinstateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        match self.status {
            // Idempotent: reinstating an approved product is a no-op.
            ProductStatus::Approved => Ok(vec![]),
            ProductStatus::Suspended => Ok(vec![ProductEvent::Reinstated(ProductReinstated {
                product_id: cmd.product_id,
                supplier_id: self.supplier_id,
                actor: cmd.actor,
                occurred_at: cmd.occurred_at,
            })]),
            other => Err(DomainError::illegal_transition(format!(
                "only suspended products can be reinstated (currently {})",
                other.as_str()
            ))),
        }
    }

    fn handle_restore(&self, cmd: &RestoreProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        if self.status != ProductStatus::Rejected {
            return Err(DomainError::illegal_transition(format!(
                "only rejected products can be restored (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Restored(ProductRestored {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_not_deleted()?;

        Ok(vec![ProductEvent::Deleted(ProductDeleted {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_recover(&self, cmd: &RecoverProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;

        if self.status != ProductStatus::Deleted {
            return Err(DomainError::illegal_transition(format!(
                "only deleted products can be recovered (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![ProductEvent::Recovered(ProductRecovered {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_purge(&self, cmd: &PurgeProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![ProductEvent::Purged(ProductPurged {
            product_id: cmd.product_id,
            supplier_id: self.supplier_id,
            category_id: self.category_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_core::UserId;
    use tradepost_events::execute;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_supplier_id() -> SupplierId {
        SupplierId::from(UserId::new())
    }

    fn pending_product() -> Product {
        let id = test_product_id();
        let mut product = Product::empty(id);
        execute(
            &mut product,
            &ProductCommand::Create(CreateProduct {
                product_id: id,
                supplier_id: test_supplier_id(),
                category_id: Some(CategoryId::new()),
                name: "Industrial Bearings".to_string(),
                description: "6204-2RS, bulk".to_string(),
                pricing: PricingMetadata {
                    base_price: Some(120),
                    currency: Some("USD".to_string()),
                    min_order_quantity: Some(500),
                },
                submit_for_review: true,
                occurred_at: now(),
            }),
        )
        .unwrap();
        product
    }

    fn approved_product() -> (Product, UserId) {
        let mut product = pending_product();
        let admin = UserId::new();
        execute(
            &mut product,
            &ProductCommand::Approve(ApproveProduct {
                product_id: product.id_typed(),
                actor: admin,
                notes: None,
                occurred_at: now(),
            }),
        )
        .unwrap();
        (product, admin)
    }

    #[test]
    fn create_as_draft_or_pending() {
        let id = test_product_id();
        let mut draft = Product::empty(id);
        execute(
            &mut draft,
            &ProductCommand::Create(CreateProduct {
                product_id: id,
                supplier_id: test_supplier_id(),
                category_id: None,
                name: "Widget".to_string(),
                description: String::new(),
                pricing: PricingMetadata::default(),
                submit_for_review: false,
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(draft.status(), ProductStatus::Draft);

        assert_eq!(pending_product().status(), ProductStatus::Pending);
    }

    #[test]
    fn draft_submission_enters_review() {
        let id = test_product_id();
        let mut product = Product::empty(id);
        execute(
            &mut product,
            &ProductCommand::Create(CreateProduct {
                product_id: id,
                supplier_id: test_supplier_id(),
                category_id: None,
                name: "Widget".to_string(),
                description: String::new(),
                pricing: PricingMetadata::default(),
                submit_for_review: false,
                occurred_at: now(),
            }),
        )
        .unwrap();

        execute(
            &mut product,
            &ProductCommand::Submit(SubmitProduct {
                product_id: id,
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Pending);
    }

    #[test]
    fn approve_stamps_reviewer() {
        let (product, admin) = approved_product();
        assert_eq!(product.status(), ProductStatus::Approved);
        assert!(product.is_publicly_visible());
        let stamp = product.review().unwrap();
        assert_eq!(stamp.reviewed_by, admin);
    }

    #[test]
    fn reject_requires_reason_and_stamps_both_fields() {
        let product = pending_product();
        let admin = UserId::new();

        let err = product
            .handle(&ProductCommand::Reject(RejectProduct {
                product_id: product.id_typed(),
                actor: admin,
                reason: "  ".to_string(),
                notes: None,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut product = product;
        execute(
            &mut product,
            &ProductCommand::Reject(RejectProduct {
                product_id: product.id_typed(),
                actor: admin,
                reason: "prohibited item".to_string(),
                notes: Some("see listing policy".to_string()),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Rejected);
        assert_eq!(product.rejection_reason(), Some("prohibited item"));
        assert_eq!(product.review().unwrap().reviewed_by, admin);
    }

    #[test]
    fn edit_of_approved_product_resets_review() {
        let (mut product, _) = approved_product();
        let events = execute(
            &mut product,
            &ProductCommand::Update(UpdateProduct {
                product_id: product.id_typed(),
                patch: ProductPatch {
                    description: Some("updated spec sheet".to_string()),
                    ..ProductPatch::default()
                },
                occurred_at: now(),
            }),
        )
        .unwrap();

        let ProductEvent::Updated(e) = &events[0] else {
            panic!("expected Updated event");
        };
        assert!(e.review_reset);
        assert_eq!(product.status(), ProductStatus::Pending);
        assert!(product.review().is_none());
        assert!(!product.is_publicly_visible());
    }

    #[test]
    fn edit_of_pending_product_does_not_reset() {
        let mut product = pending_product();
        let events = execute(
            &mut product,
            &ProductCommand::Update(UpdateProduct {
                product_id: product.id_typed(),
                patch: ProductPatch {
                    name: Some("Industrial Bearings 6204".to_string()),
                    ..ProductPatch::default()
                },
                occurred_at: now(),
            }),
        )
        .unwrap();

        let ProductEvent::Updated(e) = &events[0] else {
            panic!("expected Updated event");
        };
        assert!(!e.review_reset);
        assert_eq!(product.status(), ProductStatus::Pending);
    }

    #[test]
    fn suspend_and_reinstate_round_trip() {
        let (mut product, admin) = approved_product();
        execute(
            &mut product,
            &ProductCommand::Suspend(SuspendProduct {
                product_id: product.id_typed(),
                actor: admin,
                reason: Some("counterfeit report".to_string()),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Suspended);
        assert!(!product.is_publicly_visible());

        execute(
            &mut product,
            &ProductCommand::Reinstate(ReinstateProduct {
                product_id: product.id_typed(),
                actor: admin,
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Approved);
        assert!(product.suspension_reason().is_none());
    }

    #[test]
    fn restore_returns_rejected_product_to_queue() {
        let mut product = pending_product();
        let admin = UserId::new();
        execute(
            &mut product,
            &ProductCommand::Reject(RejectProduct {
                product_id: product.id_typed(),
                actor: admin,
                reason: "low quality images".to_string(),
                notes: None,
                occurred_at: now(),
            }),
        )
        .unwrap();

        execute(
            &mut product,
            &ProductCommand::Restore(RestoreProduct {
                product_id: product.id_typed(),
                actor: admin,
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Pending);
        assert!(product.rejection_reason().is_none());
    }

    #[test]
    fn soft_delete_then_recover_reenters_review() {
        let (mut product, _) = approved_product();
        execute(
            &mut product,
            &ProductCommand::Delete(DeleteProduct {
                product_id: product.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Deleted);

        // Soft-deleted products reject moderation but allow recovery.
        let err = product
            .handle(&ProductCommand::Approve(ApproveProduct {
                product_id: product.id_typed(),
                actor: UserId::new(),
                notes: None,
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        execute(
            &mut product,
            &ProductCommand::Recover(RecoverProduct {
                product_id: product.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(product.status(), ProductStatus::Pending);
    }

    #[test]
    fn purge_carries_category_for_counter_decrement() {
        let (mut product, admin) = approved_product();
        let category = product.category_id();
        let events = execute(
            &mut product,
            &ProductCommand::Purge(PurgeProduct {
                product_id: product.id_typed(),
                actor: admin,
                occurred_at: now(),
            }),
        )
        .unwrap();

        let ProductEvent::Purged(e) = &events[0] else {
            panic!("expected Purged event");
        };
        assert_eq!(e.category_id, category);

        let err = product
            .handle(&ProductCommand::Recover(RecoverProduct {
                product_id: product.id_typed(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: Handle is deterministic (same state + command = same events).
            #[test]
            fn handle_is_deterministic(
                name in "[A-Za-z][A-Za-z0-9 ]{0,60}",
                description in "[A-Za-z0-9 ]{0,120}"
            ) {
                let id = test_product_id();
                let mut product = Product::empty(id);
                let create = ProductCommand::Create(CreateProduct {
                    product_id: id,
                    supplier_id: test_supplier_id(),
                    category_id: None,
                    name,
                    description,
                    pricing: PricingMetadata::default(),
                    submit_for_review: true,
                    occurred_at: Utc::now(),
                });
                let events = product.handle(&create).unwrap();
                product.apply(&events[0]);

                let state_before = product.clone();
                let approve = ProductCommand::Approve(ApproveProduct {
                    product_id: id,
                    actor: UserId::new(),
                    notes: None,
                    occurred_at: Utc::now(),
                });

                let events1 = product.handle(&approve);
                prop_assert_eq!(&state_before, &product);
                let events2 = product.handle(&approve);
                prop_assert_eq!(&state_before, &product);
                prop_assert_eq!(events1.unwrap(), events2.unwrap());
            }

            /// Property: public visibility is exactly the Approved status,
            /// whatever sequence of moderation events was applied.
            #[test]
            fn visibility_tracks_approved_status(tags in proptest::collection::vec(0u8..9, 0..16)) {
                let id = test_product_id();
                let mut product = Product::empty(id);
                let supplier = test_supplier_id();
                execute(&mut product, &ProductCommand::Create(CreateProduct {
                    product_id: id,
                    supplier_id: supplier,
                    category_id: None,
                    name: "Prop Widget".to_string(),
                    description: String::new(),
                    pricing: PricingMetadata::default(),
                    submit_for_review: true,
                    occurred_at: Utc::now(),
                })).unwrap();

                let actor = UserId::new();
                for tag in tags {
                    let cmd = match tag % 9 {
                        0 => ProductCommand::Approve(ApproveProduct {
                            product_id: id, actor, notes: None, occurred_at: Utc::now(),
                        }),
                        1 => ProductCommand::Reject(RejectProduct {
                            product_id: id, actor, reason: "nope".to_string(), notes: None,
                            occurred_at: Utc::now(),
                        }),
                        2 => ProductCommand::Suspend(SuspendProduct {
                            product_id: id, actor, reason: None, occurred_at: Utc::now(),
                        }),
                        3 => ProductCommand::Reinstate(ReinstateProduct {
                            product_id: id, actor, occurred_at: Utc::now(),
                        }),
                        4 => ProductCommand::Restore(RestoreProduct {
                            product_id: id, actor, occurred_at: Utc::now(),
                        }),
                        5 => ProductCommand::Delete(DeleteProduct {
                            product_id: id, occurred_at: Utc::now(),
                        }),
                        6 => ProductCommand::Recover(RecoverProduct {
                            product_id: id, occurred_at: Utc::now(),
                        }),
                        7 => ProductCommand::Submit(SubmitProduct {
                            product_id: id, occurred_at: Utc::now(),
                        }),
                        _ => ProductCommand::Update(UpdateProduct {
                            product_id: id,
                            patch: ProductPatch {
                                description: Some("edited".to_string()),
                                ..ProductPatch::default()
                            },
                            occurred_at: Utc::now(),
                        }),
                    };
                    let _ = execute(&mut product, &cmd);

                    prop_assert_eq!(
                        product.is_publicly_visible(),
                        product.status() == ProductStatus::Approved
                    );
                }
            }
        }
    }
}
