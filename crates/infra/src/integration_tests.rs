//! Integration tests for the full event-sourced pipeline.
//!
//! Command → EventStore → EventBus → Projections → Read models / feeds.
//!
//! The bus subscriber is drained synchronously here (no background thread),
//! which keeps the tests deterministic while still exercising the exact
//! routing the API wiring performs.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use tradepost_buyers::{BuyerCommand, BuyerId, BuyerProfile, CreateBuyer, DeleteBuyer};
use tradepost_catalog::{
    ApproveProduct, CategoryId, CreateProduct, PricingMetadata, Product, ProductCommand,
    ProductId, ProductPatch, ProductStatus, UpdateProduct,
};
use tradepost_core::{AggregateId, UserId};
use tradepost_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use tradepost_inquiries::{ApproveInquiry, Inquiry, InquiryCommand, InquiryId, SubmitInquiry};
use tradepost_notifications::{AdminNotification, Notification, NotificationId, NotificationKind};
use tradepost_suppliers::{
    ApproveProfile, CompanyDetails, ContactInfo, CreateProfile, SubmitOnboarding, SupplierCommand,
    SupplierId, SupplierProfile, SupplierStatus,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::InMemoryEventStore;
use crate::projections::board::InquiryRecord;
use crate::projections::catalog::ProductRecord;
use crate::projections::directory::{BuyerRecord, SupplierRecord};
use crate::projections::library::{FollowedSupplier, SavedProduct};
use crate::projections::{
    AdminNotificationFeed, BuyerDirectoryProjection, BuyerLibrary, CascadeRules,
    InquiryBoardProjection, NotificationFeed, ProductCatalogProjection,
    SupplierDirectoryProjection,
};
use crate::read_model::InMemoryRecordStore;
use crate::streams;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

struct Harness {
    store: Arc<InMemoryEventStore>,
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    subscription: Subscription<EventEnvelope<JsonValue>>,
    suppliers:
        Arc<SupplierDirectoryProjection<Arc<InMemoryRecordStore<SupplierId, SupplierRecord>>>>,
    buyers: Arc<BuyerDirectoryProjection<Arc<InMemoryRecordStore<BuyerId, BuyerRecord>>>>,
    products: Arc<ProductCatalogProjection<Arc<InMemoryRecordStore<ProductId, ProductRecord>>>>,
    board: Arc<InquiryBoardProjection<Arc<InMemoryRecordStore<InquiryId, InquiryRecord>>>>,
    feed: Arc<NotificationFeed<Arc<InMemoryRecordStore<NotificationId, Notification>>>>,
    admin_feed:
        Arc<AdminNotificationFeed<Arc<InMemoryRecordStore<NotificationId, AdminNotification>>>>,
    library: Arc<
        BuyerLibrary<
            Arc<InMemoryRecordStore<(BuyerId, ProductId), SavedProduct>>,
            Arc<InMemoryRecordStore<(BuyerId, SupplierId), FollowedSupplier>>,
        >,
    >,
    cascade: CascadeRules,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let subscription = bus.subscribe();

        let suppliers = Arc::new(SupplierDirectoryProjection::new(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let buyers = Arc::new(BuyerDirectoryProjection::new(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let products = Arc::new(ProductCatalogProjection::new(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let board = Arc::new(InquiryBoardProjection::new(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let feed = Arc::new(NotificationFeed::new(Arc::new(InMemoryRecordStore::new())));
        let admin_feed = Arc::new(AdminNotificationFeed::new(Arc::new(
            InMemoryRecordStore::new(),
        )));
        let library = Arc::new(BuyerLibrary::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRecordStore::new()),
        ));

        let cascade = CascadeRules::new(
            vec![library.clone(), board.clone(), feed.clone()],
            vec![suppliers.clone(), buyers.clone()],
        );

        Self {
            store: store.clone(),
            dispatcher: CommandDispatcher::new(store, bus),
            subscription,
            suppliers,
            buyers,
            products,
            board,
            feed,
            admin_feed,
            library,
            cascade,
        }
    }

    /// Apply everything the bus has delivered so far, with the same routing
    /// as the production subscriber.
    fn drain(&self) {
        while let Ok(env) = self.subscription.try_recv() {
            match env.aggregate_type() {
                t if t == streams::SUPPLIER => {
                    self.suppliers.apply_envelope(&env).unwrap();
                    self.feed.apply_envelope(&env).unwrap();
                    self.admin_feed.apply_envelope(&env).unwrap();
                }
                t if t == streams::BUYER => {
                    self.buyers.apply_envelope(&env).unwrap();
                    self.cascade.apply_envelope(&env).unwrap();
                }
                t if t == streams::PRODUCT => {
                    self.products.apply_envelope(&env).unwrap();
                    self.feed.apply_envelope(&env).unwrap();
                    self.admin_feed.apply_envelope(&env).unwrap();
                }
                t if t == streams::INQUIRY => {
                    self.board.apply_envelope(&env).unwrap();
                    self.products.apply_envelope(&env).unwrap();
                    self.feed.apply_envelope(&env).unwrap();
                    self.admin_feed.apply_envelope(&env).unwrap();
                }
                _ => {}
            }
        }
    }

    fn approved_supplier(&self) -> SupplierId {
        let id = SupplierId::from(UserId::new());
        self.dispatcher
            .dispatch::<SupplierProfile>(
                id.0,
                streams::SUPPLIER,
                SupplierCommand::Create(CreateProfile {
                    supplier_id: id,
                    user_id: id.user_id(),
                    contact_email: None,
                    occurred_at: Utc::now(),
                }),
                |agg| SupplierProfile::empty(SupplierId::new(agg)),
            )
            .unwrap();
        self.dispatcher
            .dispatch::<SupplierProfile>(
                id.0,
                streams::SUPPLIER,
                SupplierCommand::SubmitOnboarding(SubmitOnboarding {
                    supplier_id: id,
                    company: CompanyDetails {
                        company_name: "Acme Industrial".to_string(),
                        ..CompanyDetails::default()
                    },
                    contact: ContactInfo::default(),
                    occurred_at: Utc::now(),
                }),
                |agg| SupplierProfile::empty(SupplierId::new(agg)),
            )
            .unwrap();
        self.dispatcher
            .dispatch::<SupplierProfile>(
                id.0,
                streams::SUPPLIER,
                SupplierCommand::Approve(ApproveProfile {
                    supplier_id: id,
                    actor: UserId::new(),
                    occurred_at: Utc::now(),
                }),
                |agg| SupplierProfile::empty(SupplierId::new(agg)),
            )
            .unwrap();
        id
    }

    fn pending_product(&self, supplier_id: SupplierId) -> ProductId {
        let id = ProductId::new(AggregateId::new());
        self.dispatcher
            .dispatch::<Product>(
                id.0,
                streams::PRODUCT,
                ProductCommand::Create(CreateProduct {
                    product_id: id,
                    supplier_id,
                    category_id: Some(CategoryId::new()),
                    name: "Industrial Bearings".to_string(),
                    description: "6204-2RS, bulk".to_string(),
                    pricing: PricingMetadata::default(),
                    submit_for_review: true,
                    occurred_at: Utc::now(),
                }),
                |agg| Product::empty(ProductId::new(agg)),
            )
            .unwrap();
        id
    }

    fn buyer(&self) -> BuyerId {
        let id = BuyerId::from(UserId::new());
        self.dispatcher
            .dispatch::<BuyerProfile>(
                id.0,
                streams::BUYER,
                BuyerCommand::Create(CreateBuyer {
                    buyer_id: id,
                    user_id: id.user_id(),
                    contact_email: None,
                    occurred_at: Utc::now(),
                }),
                |agg| BuyerProfile::empty(BuyerId::new(agg)),
            )
            .unwrap();
        id
    }
}

#[test]
fn supplier_moderation_roundtrip_reaches_directory_and_feeds() {
    let h = Harness::new();
    let id = h.approved_supplier();
    h.drain();

    let record = h.suppliers.get(&id).unwrap();
    assert_eq!(record.status, SupplierStatus::Active);
    assert!(record.verified);
    assert_eq!(record.company.company_name, "Acme Industrial");

    // Exactly one user notification for the approval.
    let notifications = h.feed.for_user(id.user_id());
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.kind == NotificationKind::ProfileApproved)
            .count(),
        1
    );

    // The onboarding submission queued admin work.
    assert!(h
        .admin_feed
        .list()
        .iter()
        .any(|n| n.subject_id == *id.0.as_uuid()));
}

#[test]
fn duplicate_create_is_a_concurrency_conflict() {
    let h = Harness::new();
    let id = h.approved_supplier();

    let err = h
        .dispatcher
        .dispatch::<SupplierProfile>(
            id.0,
            streams::SUPPLIER,
            SupplierCommand::Create(CreateProfile {
                supplier_id: id,
                user_id: id.user_id(),
                contact_email: None,
                occurred_at: Utc::now(),
            }),
            |agg| SupplierProfile::empty(SupplierId::new(agg)),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::Concurrency(_)));
}

#[test]
fn product_review_roundtrip_stamps_reviewer_and_notifies_supplier() {
    let h = Harness::new();
    let supplier = h.approved_supplier();
    let product = h.pending_product(supplier);
    let admin = UserId::new();

    h.dispatcher
        .dispatch::<Product>(
            product.0,
            streams::PRODUCT,
            ProductCommand::Approve(ApproveProduct {
                product_id: product,
                actor: admin,
                notes: None,
                occurred_at: Utc::now(),
            }),
            |agg| Product::empty(ProductId::new(agg)),
        )
        .unwrap();
    h.drain();

    let record = h.products.get(&product).unwrap();
    assert_eq!(record.status, ProductStatus::Approved);
    let review = record.review.unwrap();
    assert_eq!(review.reviewed_by, admin);

    let notifications = h.feed.for_user(supplier.user_id());
    assert!(notifications
        .iter()
        .any(|n| n.kind == NotificationKind::ProductApproved));

    // Public listing carries it while the supplier is active.
    let suppliers = h.suppliers.clone();
    let public = h
        .products
        .list_public(|sid| suppliers.get(&sid).is_some_and(|s| s.is_active()));
    assert_eq!(public.len(), 1);
}

#[test]
fn editing_an_approved_product_resets_it_to_pending() {
    let h = Harness::new();
    let supplier = h.approved_supplier();
    let product = h.pending_product(supplier);

    h.dispatcher
        .dispatch::<Product>(
            product.0,
            streams::PRODUCT,
            ProductCommand::Approve(ApproveProduct {
                product_id: product,
                actor: UserId::new(),
                notes: None,
                occurred_at: Utc::now(),
            }),
            |agg| Product::empty(ProductId::new(agg)),
        )
        .unwrap();
    h.dispatcher
        .dispatch::<Product>(
            product.0,
            streams::PRODUCT,
            ProductCommand::Update(UpdateProduct {
                product_id: product,
                patch: ProductPatch {
                    description: Some("updated spec sheet".to_string()),
                    ..ProductPatch::default()
                },
                occurred_at: Utc::now(),
            }),
            |agg| Product::empty(ProductId::new(agg)),
        )
        .unwrap();
    h.drain();

    let record = h.products.get(&product).unwrap();
    assert_eq!(record.status, ProductStatus::Pending);
    assert!(record.review.is_none());
}

#[test]
fn inquiry_dual_gate_moves_between_queues() {
    let h = Harness::new();
    let supplier = h.approved_supplier();
    let buyer = h.buyer();

    let inquiry = InquiryId::new(AggregateId::new());
    h.dispatcher
        .dispatch::<Inquiry>(
            inquiry.0,
            streams::INQUIRY,
            InquiryCommand::Submit(SubmitInquiry {
                inquiry_id: inquiry,
                buyer_id: buyer,
                supplier_id: supplier,
                product_id: None,
                subject: "Lead times".to_string(),
                message: "What are your lead times?".to_string(),
                occurred_at: Utc::now(),
            }),
            |agg| Inquiry::empty(InquiryId::new(agg)),
        )
        .unwrap();
    h.drain();

    assert_eq!(h.board.list_pending_approval().len(), 1);
    assert!(h.board.list_approved().is_empty());

    h.dispatcher
        .dispatch::<Inquiry>(
            inquiry.0,
            streams::INQUIRY,
            InquiryCommand::Approve(ApproveInquiry {
                inquiry_id: inquiry,
                actor: UserId::new(),
                occurred_at: Utc::now(),
            }),
            |agg| Inquiry::empty(InquiryId::new(agg)),
        )
        .unwrap();
    h.drain();

    assert!(h.board.list_pending_approval().is_empty());
    assert_eq!(h.board.list_approved().len(), 1);
    assert_eq!(h.board.list_for_supplier(supplier).len(), 1);
}

#[test]
fn buyer_delete_cascades_through_the_bus() {
    let h = Harness::new();
    let supplier = h.approved_supplier();
    let buyer = h.buyer();
    let product = h.pending_product(supplier);

    h.library.save_product(buyer, product, Utc::now());
    h.library.follow_supplier(buyer, supplier, Utc::now());

    let inquiry = InquiryId::new(AggregateId::new());
    h.dispatcher
        .dispatch::<Inquiry>(
            inquiry.0,
            streams::INQUIRY,
            InquiryCommand::Submit(SubmitInquiry {
                inquiry_id: inquiry,
                buyer_id: buyer,
                supplier_id: supplier,
                product_id: Some(product),
                subject: "Pricing".to_string(),
                message: "Bulk pricing for 1k units?".to_string(),
                occurred_at: Utc::now(),
            }),
            |agg| Inquiry::empty(InquiryId::new(agg)),
        )
        .unwrap();
    h.drain();
    assert_eq!(h.board.list_for_buyer(buyer).len(), 1);
    assert_eq!(h.products.get(&product).unwrap().inquiry_count, 1);

    h.dispatcher
        .dispatch::<BuyerProfile>(
            buyer.0,
            streams::BUYER,
            BuyerCommand::Delete(DeleteBuyer {
                buyer_id: buyer,
                actor: UserId::new(),
                occurred_at: Utc::now(),
            }),
            |agg| BuyerProfile::empty(BuyerId::new(agg)),
        )
        .unwrap();
    h.drain();

    assert!(h.buyers.get(&buyer).is_none());
    assert!(h.library.saved_for(buyer).is_empty());
    assert!(h.library.followed_for(buyer).is_empty());
    assert!(h.board.list_for_buyer(buyer).is_empty());
    assert!(h.feed.for_user(buyer.user_id()).is_empty());
}

#[test]
fn directory_rebuilds_from_the_store() {
    let h = Harness::new();
    let id = h.approved_supplier();
    h.drain();

    let rebuilt = SupplierDirectoryProjection::new(Arc::new(InMemoryRecordStore::<
        SupplierId,
        SupplierRecord,
    >::new()));
    rebuilt
        .rebuild_from_scratch(h.store.all_events().iter().map(|e| e.to_envelope()))
        .unwrap();

    assert_eq!(rebuilt.get(&id), h.suppliers.get(&id));
}
