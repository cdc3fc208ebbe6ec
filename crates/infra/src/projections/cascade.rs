//! Centralized delete cascades.
//!
//! Ownership edges are registered once and replayed by a single routine;
//! call sites never walk stores by hand. The edges implemented today:
//!
//! ```text
//! UserAccount  owns  SupplierProfile | BuyerProfile    (superseded/deleted account)
//! BuyerProfile owns  SavedProduct*, FollowedSupplier*,
//!                    Inquiry records, Notifications    (hard delete)
//! ```
//!
//! The cascade is itself a bus subscriber: it reacts to the buyer/account
//! lifecycle events rather than being invoked inline by handlers, so every
//! path that deletes a buyer (admin action today, whatever tomorrow) gets
//! the same cleanup.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use tradepost_buyers::{BuyerEvent, BuyerId};
use tradepost_core::UserId;
use tradepost_events::EventEnvelope;
use tradepost_identity::AccountEvent;

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::streams;

/// An edge "X is owned by a buyer": removable by buyer id.
pub trait BuyerOwned: Send + Sync {
    fn edge_name(&self) -> &'static str;

    /// Remove everything the buyer owns; returns the number of records dropped.
    fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize;
}

/// An edge "X is owned by a user account": removable by user id.
pub trait AccountOwned: Send + Sync {
    fn edge_name(&self) -> &'static str;

    fn remove_for_user(&self, user_id: UserId) -> usize;
}

/// The registered ownership edges plus the subscriber that fires them.
pub struct CascadeRules {
    buyer_edges: Vec<Arc<dyn BuyerOwned>>,
    account_edges: Vec<Arc<dyn AccountOwned>>,
    cursors: StreamCursors,
}

impl CascadeRules {
    pub fn new(
        buyer_edges: Vec<Arc<dyn BuyerOwned>>,
        account_edges: Vec<Arc<dyn AccountOwned>>,
    ) -> Self {
        Self {
            buyer_edges,
            account_edges,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != streams::BUYER && aggregate_type != streams::ACCOUNT {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        if aggregate_type == streams::BUYER {
            let event: BuyerEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            if let BuyerEvent::Deleted(e) = event {
                self.run_buyer_cascade(e.buyer_id);
            }
        } else {
            let event: AccountEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            match event {
                AccountEvent::Superseded(e) | AccountEvent::Deleted(e) => {
                    self.run_account_cascade(e.user_id);
                }
                _ => {}
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn run_buyer_cascade(&self, buyer_id: BuyerId) {
        for edge in &self.buyer_edges {
            let removed = edge.remove_for_buyer(buyer_id);
            tracing::info!(
                edge = edge.edge_name(),
                buyer_id = %buyer_id,
                removed,
                "buyer delete cascade"
            );
        }
    }

    fn run_account_cascade(&self, user_id: UserId) {
        for edge in &self.account_edges {
            let removed = edge.remove_for_user(user_id);
            tracing::info!(
                edge = edge.edge_name(),
                user_id = %user_id,
                removed,
                "account delete cascade"
            );
        }
    }
}

// ── Edge implementations ─────────────────────────────────────────────────────

use tradepost_notifications::{Notification, NotificationId};
use tradepost_inquiries::InquiryId;
use tradepost_suppliers::SupplierId;

use crate::projections::board::{InquiryBoardProjection, InquiryRecord};
use crate::projections::directory::{
    BuyerDirectoryProjection, BuyerRecord, SupplierDirectoryProjection, SupplierRecord,
};
use crate::projections::feeds::NotificationFeed;
use crate::projections::library::{BuyerLibrary, FollowedSupplier, SavedProduct};
use crate::read_model::RecordStore;

impl<SP, FS> BuyerOwned for BuyerLibrary<SP, FS>
where
    SP: RecordStore<(BuyerId, tradepost_catalog::ProductId), SavedProduct>,
    FS: RecordStore<(BuyerId, SupplierId), FollowedSupplier>,
{
    fn edge_name(&self) -> &'static str {
        "saved_products+followed_suppliers"
    }

    fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize {
        BuyerLibrary::remove_for_buyer(self, buyer_id)
    }
}

impl<S> BuyerOwned for InquiryBoardProjection<S>
where
    S: RecordStore<InquiryId, InquiryRecord>,
{
    fn edge_name(&self) -> &'static str {
        "inquiries"
    }

    fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize {
        InquiryBoardProjection::remove_for_buyer(self, buyer_id)
    }
}

impl<S> BuyerOwned for NotificationFeed<S>
where
    S: RecordStore<NotificationId, Notification>,
{
    fn edge_name(&self) -> &'static str {
        "notifications"
    }

    fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize {
        self.remove_for_user(buyer_id.user_id())
    }
}

impl<S> AccountOwned for SupplierDirectoryProjection<S>
where
    S: RecordStore<SupplierId, SupplierRecord>,
{
    fn edge_name(&self) -> &'static str {
        "supplier_profile"
    }

    fn remove_for_user(&self, user_id: UserId) -> usize {
        // Keyed by the account uuid; at most one record.
        usize::from(self.remove(&SupplierId::from(user_id)))
    }
}

impl<S> AccountOwned for BuyerDirectoryProjection<S>
where
    S: RecordStore<BuyerId, BuyerRecord>,
{
    fn edge_name(&self) -> &'static str {
        "buyer_profile"
    }

    fn remove_for_user(&self, user_id: UserId) -> usize {
        usize::from(self.remove(&BuyerId::from(user_id)))
    }
}
