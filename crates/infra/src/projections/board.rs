//! Inquiry board read model.
//!
//! Tracks both status axes per inquiry (conversation state and the admin
//! approval gate) and serves the moderation queues plus the buyer/supplier
//! inboxes. Listings are enriched with buyer, supplier, and product names at
//! request time; the joins are computed synchronously against the other read
//! models, never materialized, so they cannot go stale.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use tradepost_buyers::BuyerId;
use tradepost_catalog::ProductId;
use tradepost_events::EventEnvelope;
use tradepost_inquiries::{
    ConversationStatus, InquiryApprovalStatus, InquiryEvent, InquiryId, Reply,
};
use tradepost_suppliers::SupplierId;

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// Queryable inquiry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryRecord {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub product_id: Option<ProductId>,
    pub subject: String,
    pub message: String,
    pub conversation: ConversationStatus,
    pub approval: InquiryApprovalStatus,
    pub supplier_reply: Option<Reply>,
    pub buyer_reply: Option<Reply>,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An inquiry record joined with display names for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedInquiry {
    pub inquiry: InquiryRecord,
    pub buyer_company: String,
    pub supplier_company: String,
    /// "General Inquiry" when no product is referenced, "Unknown" when the
    /// referenced product is gone.
    pub product_name: String,
}

impl EnrichedInquiry {
    pub fn join(
        inquiry: InquiryRecord,
        buyer_company: Option<String>,
        supplier_company: Option<String>,
        product_name: Option<String>,
    ) -> Self {
        let product_name = match inquiry.product_id {
            None => "General Inquiry".to_string(),
            Some(_) => product_name.unwrap_or_else(|| "Unknown".to_string()),
        };

        Self {
            inquiry,
            buyer_company: buyer_company.unwrap_or_else(|| "Unknown".to_string()),
            supplier_company: supplier_company.unwrap_or_else(|| "Unknown".to_string()),
            product_name,
        }
    }
}

/// Inquiry board projection.
#[derive(Debug)]
pub struct InquiryBoardProjection<S>
where
    S: RecordStore<InquiryId, InquiryRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> InquiryBoardProjection<S>
where
    S: RecordStore<InquiryId, InquiryRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, inquiry_id: &InquiryId) -> Option<InquiryRecord> {
        self.store.get(inquiry_id)
    }

    pub fn list(&self) -> Vec<InquiryRecord> {
        self.store.list()
    }

    /// Admin queue: awaiting the approval gate.
    pub fn list_pending_approval(&self) -> Vec<InquiryRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.approval == InquiryApprovalStatus::Pending)
            .collect()
    }

    /// Admin queue: past the gate.
    pub fn list_approved(&self) -> Vec<InquiryRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.approval == InquiryApprovalStatus::Approved)
            .collect()
    }

    /// Supplier inbox: approved conversations only (the gate hides the rest).
    pub fn list_for_supplier(&self, supplier_id: SupplierId) -> Vec<InquiryRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| {
                r.supplier_id == supplier_id && r.approval == InquiryApprovalStatus::Approved
            })
            .collect()
    }

    /// Buyer view: everything the buyer submitted, whatever the gate says.
    pub fn list_for_buyer(&self, buyer_id: BuyerId) -> Vec<InquiryRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.buyer_id == buyer_id)
            .collect()
    }

    /// Cascade support: drop every record submitted by the buyer.
    pub fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize {
        let doomed: Vec<InquiryId> = self
            .store
            .list()
            .into_iter()
            .filter(|r| r.buyer_id == buyer_id)
            .map(|r| r.inquiry_id)
            .collect();

        for id in &doomed {
            self.store.remove(id);
        }
        doomed.len()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::INQUIRY {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: InquiryEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            InquiryEvent::Submitted(e) => {
                self.store.upsert(
                    e.inquiry_id,
                    InquiryRecord {
                        inquiry_id: e.inquiry_id,
                        buyer_id: e.buyer_id,
                        supplier_id: e.supplier_id,
                        product_id: e.product_id,
                        subject: e.subject,
                        message: e.message,
                        conversation: ConversationStatus::Pending,
                        approval: InquiryApprovalStatus::Pending,
                        supplier_reply: None,
                        buyer_reply: None,
                        rejection_reason: None,
                        submitted_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            InquiryEvent::Approved(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.approval = InquiryApprovalStatus::Approved;
                    r.rejection_reason = None;
                    // Re-engagement reset, same as the aggregate.
                    r.buyer_reply = None;
                });
            }
            InquiryEvent::Rejected(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.approval = InquiryApprovalStatus::Rejected;
                    r.rejection_reason = Some(e.reason.clone());
                    r.buyer_reply = None;
                });
            }
            InquiryEvent::SupplierReplied(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.supplier_reply = Some(Reply {
                        message: e.message.clone(),
                        at: e.occurred_at,
                    });
                    r.conversation = ConversationStatus::Replied;
                });
            }
            InquiryEvent::BuyerReplied(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.buyer_reply = Some(Reply {
                        message: e.message.clone(),
                        at: e.occurred_at,
                    });
                    r.conversation = ConversationStatus::Replied;
                });
            }
            InquiryEvent::Deleted(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.conversation = ConversationStatus::Deleted;
                });
            }
            InquiryEvent::Recovered(e) => {
                self.update(e.inquiry_id, e.occurred_at, |r| {
                    r.conversation = e.restored_to;
                });
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

    fn update(&self, inquiry_id: InquiryId, at: DateTime<Utc>, f: impl FnOnce(&mut InquiryRecord)) {
        if let Some(mut record) = self.store.get(&inquiry_id) {
            f(&mut record);
            record.updated_at = at;
            self.store.upsert(inquiry_id, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryRecordStore;
    use std::sync::Arc;
    use tradepost_core::{AggregateId, UserId};
    use tradepost_inquiries::{
        BuyerReplied, InquiryApproved, InquiryRejected, InquirySubmitted,
    };

    type TestBoard = InquiryBoardProjection<Arc<InMemoryRecordStore<InquiryId, InquiryRecord>>>;

    fn board() -> TestBoard {
        InquiryBoardProjection::new(Arc::new(InMemoryRecordStore::new()))
    }

    fn envelope(id: InquiryId, seq: u64, event: &InquiryEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            id.0,
            streams::INQUIRY,
            seq,
            serde_json::to_value(event).unwrap(),
        )
    }

    fn submitted(board: &TestBoard, buyer_id: BuyerId, supplier_id: SupplierId) -> InquiryId {
        let id = InquiryId::new(AggregateId::new());
        board
            .apply_envelope(&envelope(
                id,
                1,
                &InquiryEvent::Submitted(InquirySubmitted {
                    inquiry_id: id,
                    buyer_id,
                    supplier_id,
                    product_id: None,
                    subject: "Lead times".to_string(),
                    message: "What are your lead times for 500 units?".to_string(),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        id
    }

    #[test]
    fn approval_gate_moves_between_queues() {
        let board = board();
        let buyer = BuyerId::from(UserId::new());
        let supplier = SupplierId::from(UserId::new());
        let id = submitted(&board, buyer, supplier);

        assert_eq!(board.list_pending_approval().len(), 1);
        assert!(board.list_approved().is_empty());
        assert!(board.list_for_supplier(supplier).is_empty());

        board
            .apply_envelope(&envelope(
                id,
                2,
                &InquiryEvent::Approved(InquiryApproved {
                    inquiry_id: id,
                    buyer_id: buyer,
                    supplier_id: supplier,
                    actor: UserId::new(),
                    reapproval: false,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();

        assert!(board.list_pending_approval().is_empty());
        assert_eq!(board.list_approved().len(), 1);
        assert_eq!(board.list_for_supplier(supplier).len(), 1);
    }

    #[test]
    fn moderation_flip_clears_the_buyer_reply() {
        let board = board();
        let buyer = BuyerId::from(UserId::new());
        let supplier = SupplierId::from(UserId::new());
        let id = submitted(&board, buyer, supplier);

        board
            .apply_envelope(&envelope(
                id,
                2,
                &InquiryEvent::Approved(InquiryApproved {
                    inquiry_id: id,
                    buyer_id: buyer,
                    supplier_id: supplier,
                    actor: UserId::new(),
                    reapproval: false,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        board
            .apply_envelope(&envelope(
                id,
                3,
                &InquiryEvent::BuyerReplied(BuyerReplied {
                    inquiry_id: id,
                    buyer_id: buyer,
                    supplier_id: supplier,
                    message: "Following up.".to_string(),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        assert!(board.get(&id).unwrap().buyer_reply.is_some());

        board
            .apply_envelope(&envelope(
                id,
                4,
                &InquiryEvent::Rejected(InquiryRejected {
                    inquiry_id: id,
                    buyer_id: buyer,
                    supplier_id: supplier,
                    actor: UserId::new(),
                    reason: "spam".to_string(),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();

        let record = board.get(&id).unwrap();
        assert!(record.buyer_reply.is_none());
        assert_eq!(record.approval, InquiryApprovalStatus::Rejected);
    }

    #[test]
    fn cascade_removal_leaves_no_buyer_records() {
        let board = board();
        let buyer = BuyerId::from(UserId::new());
        let other_buyer = BuyerId::from(UserId::new());
        let supplier = SupplierId::from(UserId::new());
        submitted(&board, buyer, supplier);
        submitted(&board, buyer, supplier);
        submitted(&board, other_buyer, supplier);

        let removed = board.remove_for_buyer(buyer);
        assert_eq!(removed, 2);
        assert!(board.list_for_buyer(buyer).is_empty());
        assert_eq!(board.list_for_buyer(other_buyer).len(), 1);
    }

    #[test]
    fn enrichment_falls_back_for_missing_referents() {
        let board = board();
        let buyer = BuyerId::from(UserId::new());
        let supplier = SupplierId::from(UserId::new());
        let id = submitted(&board, buyer, supplier);
        let record = board.get(&id).unwrap();

        // No product referenced at all.
        let enriched = EnrichedInquiry::join(
            record.clone(),
            Some("Acme Buying".to_string()),
            None,
            None,
        );
        assert_eq!(enriched.product_name, "General Inquiry");
        assert_eq!(enriched.buyer_company, "Acme Buying");
        assert_eq!(enriched.supplier_company, "Unknown");

        // Product referenced but no longer resolvable.
        let mut with_product = record;
        with_product.product_id = Some(ProductId::new(AggregateId::new()));
        let enriched = EnrichedInquiry::join(with_product, None, None, None);
        assert_eq!(enriched.product_name, "Unknown");
    }
}
