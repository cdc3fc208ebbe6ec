//! Buyer personalization library (saved products, followed suppliers).
//!
//! These are plain read-model records mutated directly by the buyer, not
//! moderated aggregates. They exist here mostly for the sake of the delete
//! cascade: they are the "owned by buyer" edges that must not survive a
//! buyer hard delete.

use chrono::{DateTime, Utc};

use tradepost_buyers::BuyerId;
use tradepost_catalog::ProductId;
use tradepost_suppliers::SupplierId;

use crate::read_model::RecordStore;

/// A product bookmarked by a buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProduct {
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub saved_at: DateTime<Utc>,
}

/// A supplier followed by a buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowedSupplier {
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub followed_at: DateTime<Utc>,
}

/// Per-buyer saved products and followed suppliers.
#[derive(Debug)]
pub struct BuyerLibrary<SP, FS>
where
    SP: RecordStore<(BuyerId, ProductId), SavedProduct>,
    FS: RecordStore<(BuyerId, SupplierId), FollowedSupplier>,
{
    saved: SP,
    followed: FS,
}

impl<SP, FS> BuyerLibrary<SP, FS>
where
    SP: RecordStore<(BuyerId, ProductId), SavedProduct>,
    FS: RecordStore<(BuyerId, SupplierId), FollowedSupplier>,
{
    pub fn new(saved: SP, followed: FS) -> Self {
        Self { saved, followed }
    }

    /// Idempotent: saving an already saved product keeps the original stamp.
    pub fn save_product(&self, buyer_id: BuyerId, product_id: ProductId, at: DateTime<Utc>) {
        let key = (buyer_id, product_id);
        if self.saved.get(&key).is_none() {
            self.saved.upsert(
                key,
                SavedProduct {
                    buyer_id,
                    product_id,
                    saved_at: at,
                },
            );
        }
    }

    pub fn unsave_product(&self, buyer_id: BuyerId, product_id: ProductId) -> bool {
        self.saved.remove(&(buyer_id, product_id)).is_some()
    }

    pub fn saved_for(&self, buyer_id: BuyerId) -> Vec<SavedProduct> {
        let mut items: Vec<SavedProduct> = self
            .saved
            .list()
            .into_iter()
            .filter(|s| s.buyer_id == buyer_id)
            .collect();
        items.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        items
    }

    pub fn follow_supplier(&self, buyer_id: BuyerId, supplier_id: SupplierId, at: DateTime<Utc>) {
        let key = (buyer_id, supplier_id);
        if self.followed.get(&key).is_none() {
            self.followed.upsert(
                key,
                FollowedSupplier {
                    buyer_id,
                    supplier_id,
                    followed_at: at,
                },
            );
        }
    }

    pub fn unfollow_supplier(&self, buyer_id: BuyerId, supplier_id: SupplierId) -> bool {
        self.followed.remove(&(buyer_id, supplier_id)).is_some()
    }

    pub fn followed_for(&self, buyer_id: BuyerId) -> Vec<FollowedSupplier> {
        let mut items: Vec<FollowedSupplier> = self
            .followed
            .list()
            .into_iter()
            .filter(|f| f.buyer_id == buyer_id)
            .collect();
        items.sort_by(|a, b| b.followed_at.cmp(&a.followed_at));
        items
    }

    /// Cascade support: drop everything the buyer owns here.
    pub fn remove_for_buyer(&self, buyer_id: BuyerId) -> usize {
        let saved: Vec<(BuyerId, ProductId)> = self
            .saved
            .list()
            .into_iter()
            .filter(|s| s.buyer_id == buyer_id)
            .map(|s| (s.buyer_id, s.product_id))
            .collect();
        let followed: Vec<(BuyerId, SupplierId)> = self
            .followed
            .list()
            .into_iter()
            .filter(|f| f.buyer_id == buyer_id)
            .map(|f| (f.buyer_id, f.supplier_id))
            .collect();

        for key in &saved {
            self.saved.remove(key);
        }
        for key in &followed {
            self.followed.remove(key);
        }
        saved.len() + followed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryRecordStore;
    use std::sync::Arc;
    use tradepost_core::{AggregateId, UserId};

    fn library() -> BuyerLibrary<
        Arc<InMemoryRecordStore<(BuyerId, ProductId), SavedProduct>>,
        Arc<InMemoryRecordStore<(BuyerId, SupplierId), FollowedSupplier>>,
    > {
        BuyerLibrary::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRecordStore::new()),
        )
    }

    #[test]
    fn saving_is_idempotent() {
        let library = library();
        let buyer = BuyerId::from(UserId::new());
        let product = ProductId::new(AggregateId::new());

        let first = Utc::now();
        library.save_product(buyer, product, first);
        library.save_product(buyer, product, first + chrono::Duration::hours(1));

        let saved = library.saved_for(buyer);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].saved_at, first);

        assert!(library.unsave_product(buyer, product));
        assert!(!library.unsave_product(buyer, product));
    }

    #[test]
    fn cascade_clears_only_the_deleted_buyer() {
        let library = library();
        let buyer = BuyerId::from(UserId::new());
        let other = BuyerId::from(UserId::new());
        let supplier = SupplierId::from(UserId::new());

        library.save_product(buyer, ProductId::new(AggregateId::new()), Utc::now());
        library.follow_supplier(buyer, supplier, Utc::now());
        library.follow_supplier(other, supplier, Utc::now());

        assert_eq!(library.remove_for_buyer(buyer), 2);
        assert!(library.saved_for(buyer).is_empty());
        assert!(library.followed_for(buyer).is_empty());
        assert_eq!(library.followed_for(other).len(), 1);
    }
}
