//! Notification feeds.
//!
//! Notifications are derived data: a bus subscriber materializes exactly one
//! user-facing record per moderation transition visible to the affected
//! party, plus admin-facing records for new work entering the review queues.
//! Because the feed sits downstream of the event store, a notification
//! failure can never roll back a status change, and a lost feed is rebuilt
//! by replaying the store.

use serde_json::Value as JsonValue;

use tradepost_core::UserId;
use tradepost_events::EventEnvelope;
use tradepost_identity::AccountEvent;
use tradepost_inquiries::InquiryEvent;
use tradepost_catalog::{ProductEvent, ProductStatus};
use tradepost_notifications::{
    AdminNotification, AdminNotificationKind, Notification, NotificationId, NotificationKind,
};
use tradepost_suppliers::SupplierEvent;
use tradepost_auth::Role;

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// User-facing notification feed.
#[derive(Debug)]
pub struct NotificationFeed<S>
where
    S: RecordStore<NotificationId, Notification>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> NotificationFeed<S>
where
    S: RecordStore<NotificationId, Notification>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    /// A user's feed, newest first.
    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        let mut items: Vec<Notification> = self
            .store
            .list()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn unread_count(&self, user_id: UserId) -> usize {
        self.store
            .list()
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count()
    }

    /// Mark one notification read. Returns false when the notification does
    /// not exist or belongs to someone else.
    pub fn mark_read(&self, user_id: UserId, id: NotificationId) -> bool {
        match self.store.get(&id) {
            Some(mut n) if n.user_id == user_id => {
                n.mark_read();
                self.store.upsert(id, n);
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&self, user_id: UserId) -> usize {
        let mut flipped = 0;
        for mut n in self.store.list() {
            if n.user_id == user_id && !n.read {
                n.mark_read();
                flipped += 1;
                self.store.upsert(n.id, n);
            }
        }
        flipped
    }

    pub fn delete(&self, user_id: UserId, id: NotificationId) -> bool {
        match self.store.get(&id) {
            Some(n) if n.user_id == user_id => self.store.remove(&id).is_some(),
            _ => false,
        }
    }

    /// Cascade support: drop a user's entire feed.
    pub fn remove_for_user(&self, user_id: UserId) -> usize {
        let doomed: Vec<NotificationId> = self
            .store
            .list()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.id)
            .collect();

        for id in &doomed {
            self.store.remove(id);
        }
        doomed.len()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != streams::SUPPLIER
            && aggregate_type != streams::PRODUCT
            && aggregate_type != streams::INQUIRY
        {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        if aggregate_type == streams::SUPPLIER {
            let event: SupplierEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            self.on_supplier_event(&event);
        } else if aggregate_type == streams::PRODUCT {
            let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            self.on_product_event(&event);
        } else {
            let event: InquiryEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            self.on_inquiry_event(&event);
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn push(&self, notification: Notification) {
        self.store.upsert(notification.id, notification);
    }

    fn on_supplier_event(&self, event: &SupplierEvent) {
        match event {
            SupplierEvent::Approved(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProfileApproved,
                "Your supplier profile has been approved. You can now list products.",
                Some("/supplier/profile".to_string()),
                e.occurred_at,
            )),
            SupplierEvent::Rejected(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProfileRejected,
                format!(
                    "Your supplier profile was rejected: {}. Update your onboarding details and resubmit.",
                    e.reason
                ),
                Some("/supplier/onboarding".to_string()),
                e.occurred_at,
            )),
            SupplierEvent::Suspended(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProfileSuspended,
                match &e.reason {
                    Some(reason) => format!("Your supplier profile has been suspended: {reason}."),
                    None => "Your supplier profile has been suspended.".to_string(),
                },
                Some("/supplier/profile".to_string()),
                e.occurred_at,
            )),
            SupplierEvent::Activated(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProfileActivated,
                "Your supplier profile is active again.",
                Some("/supplier/profile".to_string()),
                e.occurred_at,
            )),
            SupplierEvent::Deleted(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProfileDeleted,
                "Your supplier profile has been deleted.",
                None,
                e.occurred_at,
            )),
            // Created / drafts / submissions / restores are not visible
            // status changes for the supplier.
            _ => {}
        }
    }

    fn on_product_event(&self, event: &ProductEvent) {
        match event {
            ProductEvent::Approved(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProductApproved,
                "Your product listing has been approved and is now live.",
                Some(format!("/supplier/products/{}", e.product_id)),
                e.occurred_at,
            )),
            ProductEvent::Rejected(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProductRejected,
                format!("Your product listing was rejected: {}.", e.reason),
                Some(format!("/supplier/products/{}", e.product_id)),
                e.occurred_at,
            )),
            ProductEvent::Suspended(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProductSuspended,
                match &e.reason {
                    Some(reason) => format!("Your product listing has been suspended: {reason}."),
                    None => "Your product listing has been suspended.".to_string(),
                },
                Some(format!("/supplier/products/{}", e.product_id)),
                e.occurred_at,
            )),
            ProductEvent::Reinstated(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::ProductReinstated,
                "Your product listing has been reinstated.",
                Some(format!("/supplier/products/{}", e.product_id)),
                e.occurred_at,
            )),
            _ => {}
        }
    }

    fn on_inquiry_event(&self, event: &InquiryEvent) {
        match event {
            InquiryEvent::Approved(e) => {
                // The buyer learns the moderation outcome; the supplier gets
                // the released conversation.
                self.push(Notification::new(
                    e.buyer_id.user_id(),
                    NotificationKind::InquiryApproved,
                    "Your inquiry has been approved and forwarded to the supplier.",
                    Some(format!("/buyer/inquiries/{}", e.inquiry_id)),
                    e.occurred_at,
                ));
                self.push(Notification::new(
                    e.supplier_id.user_id(),
                    NotificationKind::InquiryApproved,
                    "You have a new buyer inquiry.",
                    Some(format!("/supplier/inquiries/{}", e.inquiry_id)),
                    e.occurred_at,
                ));
            }
            InquiryEvent::Rejected(e) => self.push(Notification::new(
                e.buyer_id.user_id(),
                NotificationKind::InquiryRejected,
                format!("Your inquiry was rejected: {}.", e.reason),
                Some(format!("/buyer/inquiries/{}", e.inquiry_id)),
                e.occurred_at,
            )),
            InquiryEvent::SupplierReplied(e) => self.push(Notification::new(
                e.buyer_id.user_id(),
                NotificationKind::InquiryReply,
                "A supplier replied to your inquiry.",
                Some(format!("/buyer/inquiries/{}", e.inquiry_id)),
                e.occurred_at,
            )),
            InquiryEvent::BuyerReplied(e) => self.push(Notification::new(
                e.supplier_id.user_id(),
                NotificationKind::InquiryReply,
                "The buyer replied to an inquiry.",
                Some(format!("/supplier/inquiries/{}", e.inquiry_id)),
                e.occurred_at,
            )),
            _ => {}
        }
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

/// Admin-facing notification feed (new work entering the queues).
#[derive(Debug)]
pub struct AdminNotificationFeed<S>
where
    S: RecordStore<NotificationId, AdminNotification>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> AdminNotificationFeed<S>
where
    S: RecordStore<NotificationId, AdminNotification>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn list(&self) -> Vec<AdminNotification> {
        let mut items = self.store.list();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn mark_all_read(&self) -> usize {
        let mut flipped = 0;
        for mut n in self.store.list() {
            if !n.read {
                n.mark_read();
                flipped += 1;
                self.store.upsert(n.id, n);
            }
        }
        flipped
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != streams::ACCOUNT
            && aggregate_type != streams::SUPPLIER
            && aggregate_type != streams::PRODUCT
            && aggregate_type != streams::INQUIRY
        {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        if aggregate_type == streams::ACCOUNT {
            let event: AccountEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            if let AccountEvent::Registered(e) = event {
                if e.role == Role::Buyer {
                    self.push(AdminNotification::new(
                        AdminNotificationKind::BuyerRegistration,
                        format!("New buyer registration: {}", e.email),
                        *e.user_id.as_uuid(),
                        e.occurred_at,
                    ));
                }
            }
        } else if aggregate_type == streams::SUPPLIER {
            let event: SupplierEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            if let SupplierEvent::OnboardingSubmitted(e) = event {
                let message = if e.resubmission {
                    format!("Supplier resubmitted onboarding: {}", e.company.company_name)
                } else {
                    format!("New supplier awaiting review: {}", e.company.company_name)
                };
                self.push(AdminNotification::new(
                    AdminNotificationKind::SupplierRegistration,
                    message,
                    *e.supplier_id.0.as_uuid(),
                    e.occurred_at,
                ));
            }
        } else if aggregate_type == streams::PRODUCT {
            let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            match event {
                ProductEvent::Created(e) if e.status == ProductStatus::Pending => {
                    self.push(AdminNotification::new(
                        AdminNotificationKind::NewProduct,
                        format!("New product awaiting review: {}", e.name),
                        *e.product_id.0.as_uuid(),
                        e.occurred_at,
                    ));
                }
                ProductEvent::Submitted(e) => {
                    self.push(AdminNotification::new(
                        AdminNotificationKind::NewProduct,
                        "A draft product was submitted for review.",
                        *e.product_id.0.as_uuid(),
                        e.occurred_at,
                    ));
                }
                _ => {}
            }
        } else {
            let event: InquiryEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            if let InquiryEvent::Submitted(e) = event {
                self.push(AdminNotification::new(
                    AdminNotificationKind::NewInquiry,
                    format!("New inquiry awaiting review: {}", e.subject),
                    *e.inquiry_id.0.as_uuid(),
                    e.occurred_at,
                ));
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn push(&self, notification: AdminNotification) {
        self.store.upsert(notification.id, notification);
    }
}
