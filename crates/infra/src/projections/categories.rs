//! Category catalog.
//!
//! Categories are admin-managed reference data, mutated directly rather than
//! event-sourced. The catalog still consumes the product stream for the
//! denormalized counter: +1 when a product is created under a category, −1
//! only on purge. Moderation transitions and soft deletes leave the counter
//! alone, so it tracks "non-purged products ever filed here".

use serde_json::Value as JsonValue;

use tradepost_catalog::{Category, CategoryDeletion, CategoryId, plan_deletion};
use tradepost_core::{DomainError, DomainResult};
use tradepost_events::EventEnvelope;
use tradepost_catalog::ProductEvent;

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// Category store + guard rules.
#[derive(Debug)]
pub struct CategoryCatalog<S>
where
    S: RecordStore<CategoryId, Category>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> CategoryCatalog<S>
where
    S: RecordStore<CategoryId, Category>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, category_id: &CategoryId) -> Option<Category> {
        self.store.get(category_id)
    }

    pub fn list_all(&self) -> Vec<Category> {
        self.store.list()
    }

    /// Public surface: active categories only.
    pub fn list_active(&self) -> Vec<Category> {
        self.store
            .list()
            .into_iter()
            .filter(|c| c.is_active())
            .collect()
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        parent: Option<CategoryId>,
    ) -> DomainResult<Category> {
        if let Some(parent_id) = parent {
            if self.store.get(&parent_id).is_none() {
                return Err(DomainError::validation("parent category does not exist"));
            }
        }

        let category = Category::new(CategoryId::new(), name, parent)?;
        self.store.upsert(category.id_typed(), category.clone());
        Ok(category)
    }

    pub fn rename(&self, category_id: CategoryId, name: impl Into<String>) -> DomainResult<()> {
        let mut category = self.store.get(&category_id).ok_or(DomainError::NotFound)?;
        category.rename(name)?;
        self.store.upsert(category_id, category);
        Ok(())
    }

    pub fn set_parent(&self, category_id: CategoryId, parent: Option<CategoryId>) -> DomainResult<()> {
        if let Some(parent_id) = parent {
            if parent_id != category_id && self.store.get(&parent_id).is_none() {
                return Err(DomainError::validation("parent category does not exist"));
            }
        }

        let mut category = self.store.get(&category_id).ok_or(DomainError::NotFound)?;
        category.set_parent(parent)?;
        self.store.upsert(category_id, category);
        Ok(())
    }

    pub fn set_active(&self, category_id: CategoryId, active: bool) -> DomainResult<()> {
        let mut category = self.store.get(&category_id).ok_or(DomainError::NotFound)?;
        if active {
            category.activate();
        } else {
            category.deactivate();
        }
        self.store.upsert(category_id, category);
        Ok(())
    }

    /// Apply the deletion guard rules and report what actually happened.
    ///
    /// A category with subcategories is never removed; one still referenced
    /// by products is deactivated so those references stay valid.
    pub fn delete(&self, category_id: CategoryId) -> DomainResult<CategoryDeletion> {
        let category = self.store.get(&category_id).ok_or(DomainError::NotFound)?;

        let has_subcategories = self
            .store
            .list()
            .iter()
            .any(|c| c.parent() == Some(category_id));

        let outcome = plan_deletion(has_subcategories, category.product_count());
        match outcome {
            CategoryDeletion::Blocked => {}
            CategoryDeletion::Deactivated => {
                let mut category = category;
                category.deactivate();
                self.store.upsert(category_id, category);
            }
            CategoryDeletion::Removed => {
                self.store.remove(&category_id);
            }
        }

        Ok(outcome)
    }

    /// Counter maintenance from the product stream.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::PRODUCT {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            ProductEvent::Created(e) => {
                if let Some(category_id) = e.category_id {
                    if let Some(mut category) = self.store.get(&category_id) {
                        category.record_product_filed();
                        self.store.upsert(category_id, category);
                    }
                }
            }
            ProductEvent::Purged(e) => {
                if let Some(category_id) = e.category_id {
                    if let Some(mut category) = self.store.get(&category_id) {
                        category.record_product_purged();
                        self.store.upsert(category_id, category);
                    }
                }
            }
            _ => {}
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryRecordStore;
    use chrono::Utc;
    use std::sync::Arc;
    use tradepost_catalog::product::{ProductCreated, ProductDeleted, ProductPurged};
    use tradepost_catalog::{PricingMetadata, ProductId, ProductStatus};
    use tradepost_core::{AggregateId, UserId};
    use tradepost_suppliers::SupplierId;

    type TestCatalog = CategoryCatalog<Arc<InMemoryRecordStore<CategoryId, Category>>>;

    fn catalog() -> TestCatalog {
        CategoryCatalog::new(Arc::new(InMemoryRecordStore::new()))
    }

    fn product_envelope(id: ProductId, seq: u64, event: &ProductEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            id.0,
            streams::PRODUCT,
            seq,
            serde_json::to_value(event).unwrap(),
        )
    }

    fn file_product(catalog: &TestCatalog, category_id: CategoryId) -> ProductId {
        let id = ProductId::new(AggregateId::new());
        catalog
            .apply_envelope(&product_envelope(
                id,
                1,
                &ProductEvent::Created(ProductCreated {
                    product_id: id,
                    supplier_id: SupplierId::from(UserId::new()),
                    category_id: Some(category_id),
                    name: "Widget".to_string(),
                    description: String::new(),
                    pricing: PricingMetadata::default(),
                    status: ProductStatus::Pending,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        id
    }

    #[test]
    fn delete_is_blocked_while_subcategories_exist() {
        let catalog = catalog();
        let parent = catalog.create("Machinery", None).unwrap();
        catalog.create("Bearings", Some(parent.id_typed())).unwrap();

        let outcome = catalog.delete(parent.id_typed()).unwrap();
        assert_eq!(outcome, CategoryDeletion::Blocked);
        assert!(catalog
            .list_all()
            .iter()
            .any(|c| c.id_typed() == parent.id_typed()));
    }

    #[test]
    fn delete_deactivates_when_products_reference_it() {
        let catalog = catalog();
        let category = catalog.create("Machinery", None).unwrap();
        file_product(&catalog, category.id_typed());

        let outcome = catalog.delete(category.id_typed()).unwrap();
        assert_eq!(outcome, CategoryDeletion::Deactivated);

        let stored = catalog.get(&category.id_typed()).unwrap();
        assert!(!stored.is_active());
        assert!(catalog.list_active().is_empty());
    }

    #[test]
    fn delete_removes_an_unreferenced_leaf() {
        let catalog = catalog();
        let category = catalog.create("Machinery", None).unwrap();

        let outcome = catalog.delete(category.id_typed()).unwrap();
        assert_eq!(outcome, CategoryDeletion::Removed);
        assert!(catalog.get(&category.id_typed()).is_none());
    }

    #[test]
    fn counter_moves_on_create_and_purge_but_not_soft_delete() {
        let catalog = catalog();
        let category = catalog.create("Machinery", None).unwrap();
        let category_id = category.id_typed();
        let product_id = file_product(&catalog, category_id);
        assert_eq!(catalog.get(&category_id).unwrap().product_count(), 1);

        let supplier = SupplierId::from(UserId::new());
        catalog
            .apply_envelope(&product_envelope(
                product_id,
                2,
                &ProductEvent::Deleted(ProductDeleted {
                    product_id,
                    supplier_id: supplier,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        assert_eq!(catalog.get(&category_id).unwrap().product_count(), 1);

        catalog
            .apply_envelope(&product_envelope(
                product_id,
                3,
                &ProductEvent::Purged(ProductPurged {
                    product_id,
                    supplier_id: supplier,
                    category_id: Some(category_id),
                    actor: UserId::new(),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        assert_eq!(catalog.get(&category_id).unwrap().product_count(), 0);
    }

    #[test]
    fn create_rejects_missing_parent() {
        let catalog = catalog();
        let err = catalog.create("Orphan", Some(CategoryId::new())).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
