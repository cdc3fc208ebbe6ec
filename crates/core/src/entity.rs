/// Something with a stable identity across state changes.
///
/// Profiles, products, and inquiries all keep the same id through their
/// moderation lifecycle; equality of records is identity equality, not
/// field equality.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
