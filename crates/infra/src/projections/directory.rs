//! Supplier and buyer directories.
//!
//! Moderation queues and profile lookups read from here; the records mirror
//! the aggregate state one event at a time. Soft-deleted suppliers stay in
//! the directory (status `Deleted`) for the audit surface; hard-deleted
//! buyers are removed outright.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use tradepost_buyers::{BuyerEvent, BuyerId, BuyerStatus};
use tradepost_core::UserId;
use tradepost_events::EventEnvelope;
use tradepost_suppliers::{
    CompanyDetails, ContactInfo, SupplierEvent, SupplierId, SupplierStatus,
};

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// Queryable supplier profile record.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRecord {
    pub supplier_id: SupplierId,
    pub user_id: UserId,
    pub company: CompanyDetails,
    pub contact: ContactInfo,
    pub status: SupplierStatus,
    pub verified: bool,
    pub rating: u8,
    pub onboarding_completed: bool,
    pub onboarding_draft: Option<JsonValue>,
    pub rejection_reason: Option<String>,
    pub suspension_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplierRecord {
    /// Whether this supplier may appear on public surfaces.
    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }
}

/// Supplier directory projection.
#[derive(Debug)]
pub struct SupplierDirectoryProjection<S>
where
    S: RecordStore<SupplierId, SupplierRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> SupplierDirectoryProjection<S>
where
    S: RecordStore<SupplierId, SupplierRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, supplier_id: &SupplierId) -> Option<SupplierRecord> {
        self.store.get(supplier_id)
    }

    /// Profiles are one-to-one with accounts, keyed by the same uuid.
    pub fn by_user(&self, user_id: UserId) -> Option<SupplierRecord> {
        self.store.get(&SupplierId::from(user_id))
    }

    pub fn list(&self) -> Vec<SupplierRecord> {
        self.store.list()
    }

    pub fn list_by_status(&self, status: SupplierStatus) -> Vec<SupplierRecord> {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }

    /// Drop a record outright (account supersede/delete cascade).
    pub fn remove(&self, supplier_id: &SupplierId) -> bool {
        self.store.remove(supplier_id).is_some()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::SUPPLIER {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: SupplierEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            SupplierEvent::Created(e) => {
                self.store.upsert(
                    e.supplier_id,
                    SupplierRecord {
                        supplier_id: e.supplier_id,
                        user_id: e.user_id,
                        company: CompanyDetails::default(),
                        contact: ContactInfo {
                            email: e.contact_email,
                            phone: None,
                        },
                        status: SupplierStatus::PendingApproval,
                        verified: false,
                        rating: 0,
                        onboarding_completed: false,
                        onboarding_draft: None,
                        rejection_reason: None,
                        suspension_reason: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            SupplierEvent::DraftSaved(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.onboarding_draft = Some(e.draft.clone());
                });
            }
            SupplierEvent::OnboardingSubmitted(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.company = e.company.clone();
                    r.contact = e.contact.clone();
                    r.onboarding_completed = true;
                    r.onboarding_draft = None;
                    r.status = SupplierStatus::PendingApproval;
                    r.verified = false;
                    r.rejection_reason = None;
                });
            }
            SupplierEvent::Approved(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::Active;
                    r.verified = true;
                    r.rejection_reason = None;
                });
            }
            SupplierEvent::Rejected(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::Rejected;
                    r.verified = false;
                    r.rejection_reason = Some(e.reason.clone());
                });
            }
            SupplierEvent::Suspended(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::Suspended;
                    r.suspension_reason = e.reason.clone();
                });
            }
            SupplierEvent::Activated(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::Active;
                    r.suspension_reason = None;
                });
            }
            SupplierEvent::Deleted(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::Deleted;
                    r.verified = false;
                });
            }
            SupplierEvent::Restored(e) => {
                self.update(e.supplier_id, e.occurred_at, |r| {
                    r.status = SupplierStatus::PendingApproval;
                    r.verified = false;
                    r.rejection_reason = None;
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

    fn update(
        &self,
        supplier_id: SupplierId,
        at: DateTime<Utc>,
        f: impl FnOnce(&mut SupplierRecord),
    ) {
        if let Some(mut record) = self.store.get(&supplier_id) {
            f(&mut record);
            record.updated_at = at;
            self.store.upsert(supplier_id, record);
        }
    }
}

/// Queryable buyer profile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerRecord {
    pub buyer_id: BuyerId,
    pub user_id: UserId,
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub status: BuyerStatus,
    pub suspension_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Buyer directory projection.
#[derive(Debug)]
pub struct BuyerDirectoryProjection<S>
where
    S: RecordStore<BuyerId, BuyerRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> BuyerDirectoryProjection<S>
where
    S: RecordStore<BuyerId, BuyerRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, buyer_id: &BuyerId) -> Option<BuyerRecord> {
        self.store.get(buyer_id)
    }

    pub fn by_user(&self, user_id: UserId) -> Option<BuyerRecord> {
        self.store.get(&BuyerId::from(user_id))
    }

    pub fn list(&self) -> Vec<BuyerRecord> {
        self.store.list()
    }

    /// Drop a record outright (account supersede/delete cascade).
    pub fn remove(&self, buyer_id: &BuyerId) -> bool {
        self.store.remove(buyer_id).is_some()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::BUYER {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: BuyerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            BuyerEvent::Created(e) => {
                self.store.upsert(
                    e.buyer_id,
                    BuyerRecord {
                        buyer_id: e.buyer_id,
                        user_id: e.user_id,
                        company_name: None,
                        contact_email: e.contact_email,
                        status: BuyerStatus::Active,
                        suspension_reason: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            BuyerEvent::DetailsUpdated(e) => {
                if let Some(mut record) = self.store.get(&e.buyer_id) {
                    if e.company_name.is_some() {
                        record.company_name = e.company_name.clone();
                    }
                    if e.contact_email.is_some() {
                        record.contact_email = e.contact_email.clone();
                    }
                    record.updated_at = e.occurred_at;
                    self.store.upsert(e.buyer_id, record);
                }
            }
            BuyerEvent::Suspended(e) => {
                if let Some(mut record) = self.store.get(&e.buyer_id) {
                    record.status = BuyerStatus::Suspended;
                    record.suspension_reason = e.reason.clone();
                    record.updated_at = e.occurred_at;
                    self.store.upsert(e.buyer_id, record);
                }
            }
            BuyerEvent::Activated(e) => {
                if let Some(mut record) = self.store.get(&e.buyer_id) {
                    record.status = BuyerStatus::Active;
                    record.suspension_reason = None;
                    record.updated_at = e.occurred_at;
                    self.store.upsert(e.buyer_id, record);
                }
            }
            // Hard delete; personalization/inquiry/notification cleanup is
            // the cascade's job.
            BuyerEvent::Deleted(e) => {
                self.store.remove(&e.buyer_id);
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
}
