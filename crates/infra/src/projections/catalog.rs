//! Product catalog read model.
//!
//! Backs the public listing, the supplier dashboard, and the admin review
//! queues. The public listing filter lives in [`ProductCatalogProjection::list_public`]:
//! only `Approved` products of an active supplier are returned; every other
//! consumer queries by explicit status.
//!
//! Besides the product stream, the projection consumes inquiry submissions
//! to keep the per-product inquiry counter; the view counter is bumped on
//! the read path (public product fetch), not by an event.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use tradepost_catalog::{
    CategoryId, PricingMetadata, ProductEvent, ProductId, ProductStatus, ReviewStamp,
};
use tradepost_events::EventEnvelope;
use tradepost_inquiries::InquiryEvent;
use tradepost_suppliers::SupplierId;

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// Queryable product record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub pricing: PricingMetadata,
    pub status: ProductStatus,
    pub review: Option<ReviewStamp>,
    pub rejection_reason: Option<String>,
    pub suspension_reason: Option<String>,
    pub view_count: u64,
    pub inquiry_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product catalog projection.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: RecordStore<ProductId, ProductRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: RecordStore<ProductId, ProductRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<ProductRecord> {
        self.store.get(product_id)
    }

    pub fn list(&self) -> Vec<ProductRecord> {
        self.store.list()
    }

    pub fn list_by_status(&self, status: ProductStatus) -> Vec<ProductRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }

    pub fn list_for_supplier(&self, supplier_id: SupplierId) -> Vec<ProductRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.supplier_id == supplier_id)
            .collect()
    }

    /// Public listing: approved products of active suppliers only.
    ///
    /// The supplier check is a synchronous join against the directory
    /// (passed in as a predicate); a supplier soft delete or suspension
    /// therefore hides their products without touching product state, and
    /// reactivation restores visibility without re-review.
    pub fn list_public(&self, supplier_is_active: impl Fn(SupplierId) -> bool) -> Vec<ProductRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.status == ProductStatus::Approved && supplier_is_active(r.supplier_id))
            .collect()
    }

    /// Bump the view counter for a public product fetch.
    pub fn record_view(&self, product_id: &ProductId) {
        if let Some(mut record) = self.store.get(product_id) {
            record.view_count += 1;
            self.store.upsert(*product_id, record);
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        match envelope.aggregate_type() {
            t if t == streams::PRODUCT => self.apply_product(envelope),
            t if t == streams::INQUIRY => self.apply_inquiry(envelope),
            _ => Ok(()),
        }
    }

    fn apply_product(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            ProductEvent::Created(e) => {
                self.store.upsert(
                    e.product_id,
                    ProductRecord {
                        product_id: e.product_id,
                        supplier_id: e.supplier_id,
                        category_id: e.category_id,
                        name: e.name,
                        description: e.description,
                        pricing: e.pricing,
                        status: e.status,
                        review: None,
                        rejection_reason: None,
                        suspension_reason: None,
                        view_count: 0,
                        inquiry_count: 0,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ProductEvent::Submitted(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Pending;
                });
            }
            ProductEvent::Updated(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    if let Some(name) = &e.patch.name {
                        r.name = name.clone();
                    }
                    if let Some(description) = &e.patch.description {
                        r.description = description.clone();
                    }
                    if let Some(category_id) = &e.patch.category_id {
                        r.category_id = *category_id;
                    }
                    if let Some(pricing) = &e.patch.pricing {
                        r.pricing = pricing.clone();
                    }
                    if e.review_reset {
                        r.status = ProductStatus::Pending;
                        r.review = None;
                    }
                });
            }
            ProductEvent::Approved(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Approved;
                    r.review = Some(ReviewStamp {
                        reviewed_by: e.actor,
                        reviewed_at: e.occurred_at,
                        notes: e.notes.clone(),
                    });
                    r.rejection_reason = None;
                });
            }
            ProductEvent::Rejected(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Rejected;
                    r.review = Some(ReviewStamp {
                        reviewed_by: e.actor,
                        reviewed_at: e.occurred_at,
                        notes: e.notes.clone(),
                    });
                    r.rejection_reason = Some(e.reason.clone());
                });
            }
            ProductEvent::Suspended(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Suspended;
                    r.suspension_reason = e.reason.clone();
                });
            }
            ProductEvent::Reinstated(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Approved;
                    r.suspension_reason = None;
                });
            }
            ProductEvent::Restored(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Pending;
                    r.rejection_reason = None;
                    r.review = None;
                });
            }
            ProductEvent::Deleted(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Deleted;
                });
            }
            ProductEvent::Recovered(e) => {
                self.update(e.product_id, e.occurred_at, |r| {
                    r.status = ProductStatus::Pending;
                    r.review = None;
                });
            }
            ProductEvent::Purged(e) => {
                self.store.remove(&e.product_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn apply_inquiry(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: InquiryEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        if let InquiryEvent::Submitted(e) = event {
            if let Some(product_id) = e.product_id {
                if let Some(mut record) = self.store.get(&product_id) {
                    record.inquiry_count += 1;
                    self.store.upsert(product_id, record);
                }
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.store.clear();
        self.cursors.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }

    fn update(&self, product_id: ProductId, at: DateTime<Utc>, f: impl FnOnce(&mut ProductRecord)) {
        if let Some(mut record) = self.store.get(&product_id) {
            f(&mut record);
            record.updated_at = at;
            self.store.upsert(product_id, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryRecordStore;
    use std::sync::Arc;
    use tradepost_core::{AggregateId, UserId};
    use tradepost_catalog::product::{ProductApproved, ProductCreated, ProductPurged};

    type TestProjection =
        ProductCatalogProjection<Arc<InMemoryRecordStore<ProductId, ProductRecord>>>;

    fn projection() -> TestProjection {
        ProductCatalogProjection::new(Arc::new(InMemoryRecordStore::new()))
    }

    fn envelope(id: ProductId, seq: u64, event: &ProductEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            id.0,
            streams::PRODUCT,
            seq,
            serde_json::to_value(event).unwrap(),
        )
    }

    fn created(projection: &TestProjection, supplier_id: SupplierId) -> ProductId {
        let id = ProductId::new(AggregateId::new());
        projection
            .apply_envelope(&envelope(
                id,
                1,
                &ProductEvent::Created(ProductCreated {
                    product_id: id,
                    supplier_id,
                    category_id: Some(CategoryId::new()),
                    name: "Industrial Bearings".to_string(),
                    description: String::new(),
                    pricing: PricingMetadata::default(),
                    status: ProductStatus::Pending,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        id
    }

    fn approve(projection: &TestProjection, id: ProductId, supplier_id: SupplierId, seq: u64) {
        projection
            .apply_envelope(&envelope(
                id,
                seq,
                &ProductEvent::Approved(ProductApproved {
                    product_id: id,
                    supplier_id,
                    actor: UserId::new(),
                    notes: None,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
    }

    #[test]
    fn public_listing_excludes_everything_but_approved() {
        let projection = projection();
        let supplier = SupplierId::from(UserId::new());
        let pending = created(&projection, supplier);
        let approved = created(&projection, supplier);
        approve(&projection, approved, supplier, 2);

        let public = projection.list_public(|_| true);
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].product_id, approved);
        assert!(public.iter().all(|r| r.status == ProductStatus::Approved));
        assert!(!public.iter().any(|r| r.product_id == pending));
    }

    #[test]
    fn public_listing_hides_products_of_inactive_suppliers() {
        let projection = projection();
        let supplier = SupplierId::from(UserId::new());
        let id = created(&projection, supplier);
        approve(&projection, id, supplier, 2);

        assert_eq!(projection.list_public(|_| true).len(), 1);
        assert_eq!(projection.list_public(|_| false).len(), 0);
        // The product itself keeps its status; only visibility changes.
        assert_eq!(projection.get(&id).unwrap().status, ProductStatus::Approved);
    }

    #[test]
    fn inquiry_submission_bumps_the_product_counter() {
        let projection = projection();
        let supplier = SupplierId::from(UserId::new());
        let id = created(&projection, supplier);

        let inquiry_id = tradepost_inquiries::InquiryId::new(AggregateId::new());
        let submitted = InquiryEvent::Submitted(tradepost_inquiries::InquirySubmitted {
            inquiry_id,
            buyer_id: tradepost_buyers::BuyerId::from(UserId::new()),
            supplier_id: supplier,
            product_id: Some(id),
            subject: "MOQ".to_string(),
            message: "What is the minimum order?".to_string(),
            occurred_at: Utc::now(),
        });
        projection
            .apply_envelope(&EventEnvelope::new(
                uuid::Uuid::now_v7(),
                inquiry_id.0,
                streams::INQUIRY,
                1,
                serde_json::to_value(&submitted).unwrap(),
            ))
            .unwrap();

        assert_eq!(projection.get(&id).unwrap().inquiry_count, 1);
    }

    #[test]
    fn purge_removes_the_record() {
        let projection = projection();
        let supplier = SupplierId::from(UserId::new());
        let id = created(&projection, supplier);

        let category = projection.get(&id).unwrap().category_id;
        projection
            .apply_envelope(&envelope(
                id,
                2,
                &ProductEvent::Purged(ProductPurged {
                    product_id: id,
                    supplier_id: supplier,
                    category_id: category,
                    actor: UserId::new(),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();

        assert!(projection.get(&id).is_none());
    }

    #[test]
    fn record_view_increments_only_the_view_counter() {
        let projection = projection();
        let supplier = SupplierId::from(UserId::new());
        let id = created(&projection, supplier);

        projection.record_view(&id);
        projection.record_view(&id);

        let record = projection.get(&id).unwrap();
        assert_eq!(record.view_count, 2);
        assert_eq!(record.inquiry_count, 0);
    }
}
