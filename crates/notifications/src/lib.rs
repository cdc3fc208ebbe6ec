//! `tradepost-notifications` — append-only notification records derived from
//! moderation events.

pub mod record;

pub use record::{
    AdminNotification, AdminNotificationKind, Notification, NotificationId, NotificationKind,
};
