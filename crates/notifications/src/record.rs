//! Notification records.
//!
//! These are plain read-model records, not aggregates: they are derived from
//! moderation events, carry a read flag, and have no further lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradepost_core::UserId;

/// Notification identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a user-facing notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProfileApproved,
    ProfileRejected,
    ProfileSuspended,
    ProfileActivated,
    ProfileDeleted,
    ProductApproved,
    ProductRejected,
    ProductSuspended,
    ProductReinstated,
    InquiryApproved,
    InquiryRejected,
    InquiryReply,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ProfileApproved => "profile_approved",
            NotificationKind::ProfileRejected => "profile_rejected",
            NotificationKind::ProfileSuspended => "profile_suspended",
            NotificationKind::ProfileActivated => "profile_activated",
            NotificationKind::ProfileDeleted => "profile_deleted",
            NotificationKind::ProductApproved => "product_approved",
            NotificationKind::ProductRejected => "product_rejected",
            NotificationKind::ProductSuspended => "product_suspended",
            NotificationKind::ProductReinstated => "product_reinstated",
            NotificationKind::InquiryApproved => "inquiry_approved",
            NotificationKind::InquiryRejected => "inquiry_rejected",
            NotificationKind::InquiryReply => "inquiry_reply",
        }
    }
}

/// What an admin-facing notification is about (new work in the queues).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminNotificationKind {
    SupplierRegistration,
    BuyerRegistration,
    NewProduct,
    NewInquiry,
}

impl AdminNotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminNotificationKind::SupplierRegistration => "supplier_registration",
            AdminNotificationKind::BuyerRegistration => "buyer_registration",
            AdminNotificationKind::NewProduct => "new_product",
            AdminNotificationKind::NewInquiry => "new_inquiry",
        }
    }
}

/// A user-facing notification.
///
/// Exactly one is created per moderation transition visible to the affected
/// party; `link` points at the follow-up action (the profile, listing, or
/// conversation in question).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        link: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind,
            message: message.into(),
            link,
            read: false,
            created_at,
        }
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

/// An admin-facing notification (new registrations, new submissions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: NotificationId,
    pub kind: AdminNotificationKind,
    pub message: String,
    /// The entity awaiting review (account, profile, product, or inquiry).
    pub subject_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminNotification {
    pub fn new(
        kind: AdminNotificationKind,
        message: impl Into<String>,
        subject_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            message: message.into(),
            subject_id,
            read: false,
            created_at,
        }
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}
