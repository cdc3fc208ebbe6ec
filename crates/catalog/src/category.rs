//! Category tree administration.
//!
//! Categories are admin-managed reference data, not moderated aggregates:
//! the interesting rules are the deletion guards and the denormalized
//! product counter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradepost_core::{DomainError, DomainResult, Entity};

/// Category identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Uuid);

impl CategoryId {
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

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for CategoryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("CategoryId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Outcome of a category deletion request.
///
/// The guard rules:
/// - a category with subcategories is never removed (`Blocked`);
/// - a category still referenced by products is deactivated instead of
///   removed, so existing products keep a valid reference (`Deactivated`);
/// - otherwise it is removed outright (`Removed`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryDeletion {
    Blocked,
    Deactivated,
    Removed,
}

/// Decide what deleting a category should do, given its current references.
pub fn plan_deletion(has_subcategories: bool, product_count: u64) -> CategoryDeletion {
    if has_subcategories {
        CategoryDeletion::Blocked
    } else if product_count > 0 {
        CategoryDeletion::Deactivated
    } else {
        CategoryDeletion::Removed
    }
}

/// A product category (optionally nested one level via `parent`).
///
/// `product_count` is denormalized: +1 when a product is created under the
/// category, −1 only when a product is purged (hard-deleted). Soft deletes
/// and moderation transitions do not touch it, so the counter tracks
/// "non-purged products ever filed here" rather than live approved listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    parent: Option<CategoryId>,
    active: bool,
    product_count: u64,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, parent: Option<CategoryId>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            parent,
            active: true,
            product_count: 0,
        })
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn product_count(&self) -> u64 {
        self.product_count
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        self.name = name.trim().to_string();
        Ok(())
    }

    pub fn set_parent(&mut self, parent: Option<CategoryId>) -> DomainResult<()> {
        if parent == Some(self.id) {
            return Err(DomainError::invariant("category cannot be its own parent"));
        }
        self.parent = parent;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Counter bump for a product created under this category.
    pub fn record_product_filed(&mut self) {
        self.product_count += 1;
    }

    /// Counter drop for a purged (hard-deleted) product.
    pub fn record_product_purged(&mut self) {
        self.product_count = self.product_count.saturating_sub(1);
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> Category {
        Category::new(CategoryId::new(), name, None).unwrap()
    }

    #[test]
    fn new_category_is_active_and_empty() {
        let cat = category("Machinery");
        assert!(cat.is_active());
        assert_eq!(cat.product_count(), 0);
        assert_eq!(cat.name(), "Machinery");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Category::new(CategoryId::new(), "   ", None).is_err());

        let mut cat = category("Machinery");
        assert!(cat.rename("").is_err());
        assert_eq!(cat.name(), "Machinery");
    }

    #[test]
    fn category_cannot_parent_itself() {
        let mut cat = category("Machinery");
        let err = cat.set_parent(Some(cat.id_typed())).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn deletion_is_blocked_with_subcategories() {
        assert_eq!(plan_deletion(true, 0), CategoryDeletion::Blocked);
        // Subcategories win even when products also reference it.
        assert_eq!(plan_deletion(true, 12), CategoryDeletion::Blocked);
    }

    #[test]
    fn deletion_deactivates_with_referencing_products() {
        assert_eq!(plan_deletion(false, 1), CategoryDeletion::Deactivated);
    }

    #[test]
    fn deletion_removes_unreferenced_leaf() {
        assert_eq!(plan_deletion(false, 0), CategoryDeletion::Removed);
    }

    #[test]
    fn counter_only_moves_on_file_and_purge() {
        let mut cat = category("Bearings");
        cat.record_product_filed();
        cat.record_product_filed();
        assert_eq!(cat.product_count(), 2);

        cat.record_product_purged();
        assert_eq!(cat.product_count(), 1);

        // Never underflows.
        cat.record_product_purged();
        cat.record_product_purged();
        assert_eq!(cat.product_count(), 0);
    }
}
