use chrono::{DateTime, Utc};

/// A fact that already happened.
///
/// Events are append-only; nothing edits or retracts one after it is
/// stored. `event_type` is the stable wire name projections and the audit
/// trail key on, `version` leaves room for payload schema evolution, and
/// `occurred_at` is business time (when the moderation action happened,
/// not when the row was written).
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted name, e.g. "suppliers.profile.approved".
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
