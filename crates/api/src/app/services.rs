//! Infrastructure wiring for the API process.
//!
//! One event store + one bus + one dispatcher, with every read model hanging
//! off a background bus subscriber. The in-memory wiring serves dev/test;
//! the Postgres event store (behind the `postgres` feature) is the
//! durability option; read models stay in-memory and are rebuilt from the
//! store at startup.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use tradepost_auth::{Hs256JwtCodec, JwtValidator, Role};
use tradepost_buyers::BuyerId;
use tradepost_catalog::{Category, CategoryId, ProductId};
use tradepost_core::{AggregateId, DomainError, UserId};
use tradepost_events::{EventBus, EventEnvelope, InMemoryEventBus};
use tradepost_identity::{AccountCommand, RegisterAccount, TokenRecord, hash_password};
use tradepost_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use tradepost_infra::event_store::{
    EventFilter, EventQuery, EventQueryResult, InMemoryEventStore, Pagination, StoredEvent,
};
#[cfg(feature = "postgres")]
use tradepost_infra::event_store::PostgresEventStore;
use tradepost_infra::projections::{
    AccountRecord, AccountsProjection, AdminNotificationFeed, BuyerDirectoryProjection,
    BuyerLibrary, BuyerRecord, CascadeRules, InquiryBoardProjection, InquiryRecord,
    NotificationFeed, ProductCatalogProjection, ProductRecord, SupplierDirectoryProjection,
    SupplierRecord,
};
use tradepost_infra::projections::library::{FollowedSupplier, SavedProduct};
use tradepost_infra::read_model::InMemoryRecordStore;
use tradepost_infra::streams;
use tradepost_inquiries::InquiryId;
use tradepost_notifications::{AdminNotification, Notification, NotificationId};
use tradepost_suppliers::SupplierId;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;
#[cfg(feature = "postgres")]
type PersistentDispatcher = CommandDispatcher<Arc<PostgresEventStore>, Bus>;

pub type Accounts = Arc<AccountsProjection<Arc<InMemoryRecordStore<UserId, AccountRecord>>>>;
pub type Suppliers =
    Arc<SupplierDirectoryProjection<Arc<InMemoryRecordStore<SupplierId, SupplierRecord>>>>;
pub type Buyers = Arc<BuyerDirectoryProjection<Arc<InMemoryRecordStore<BuyerId, BuyerRecord>>>>;
pub type Products =
    Arc<ProductCatalogProjection<Arc<InMemoryRecordStore<ProductId, ProductRecord>>>>;
pub type Categories =
    Arc<tradepost_infra::projections::CategoryCatalog<Arc<InMemoryRecordStore<CategoryId, Category>>>>;
pub type Board = Arc<InquiryBoardProjection<Arc<InMemoryRecordStore<InquiryId, InquiryRecord>>>>;
pub type Feed = Arc<NotificationFeed<Arc<InMemoryRecordStore<NotificationId, Notification>>>>;
pub type AdminFeed =
    Arc<AdminNotificationFeed<Arc<InMemoryRecordStore<NotificationId, AdminNotification>>>>;
pub type Library = Arc<
    BuyerLibrary<
        Arc<InMemoryRecordStore<(BuyerId, ProductId), SavedProduct>>,
        Arc<InMemoryRecordStore<(BuyerId, SupplierId), FollowedSupplier>>,
    >,
>;

/// Every read model the route handlers query.
#[derive(Clone)]
pub struct Projections {
    pub accounts: Accounts,
    pub suppliers: Suppliers,
    pub buyers: Buyers,
    pub products: Products,
    pub categories: Categories,
    pub board: Board,
    pub feed: Feed,
    pub admin_feed: AdminFeed,
    pub library: Library,
}

fn build_projections() -> (Projections, Arc<CascadeRules>) {
    let accounts: Accounts = Arc::new(AccountsProjection::new(Arc::new(InMemoryRecordStore::new())));
    let suppliers: Suppliers = Arc::new(SupplierDirectoryProjection::new(Arc::new(
        InMemoryRecordStore::new(),
    )));
    let buyers: Buyers = Arc::new(BuyerDirectoryProjection::new(Arc::new(
        InMemoryRecordStore::new(),
    )));
    let products: Products = Arc::new(ProductCatalogProjection::new(Arc::new(
        InMemoryRecordStore::new(),
    )));
    let categories: Categories = Arc::new(tradepost_infra::projections::CategoryCatalog::new(
        Arc::new(InMemoryRecordStore::new()),
    ));
    let board: Board = Arc::new(InquiryBoardProjection::new(Arc::new(
        InMemoryRecordStore::new(),
    )));
    let feed: Feed = Arc::new(NotificationFeed::new(Arc::new(InMemoryRecordStore::new())));
    let admin_feed: AdminFeed = Arc::new(AdminNotificationFeed::new(Arc::new(
        InMemoryRecordStore::new(),
    )));
    let library: Library = Arc::new(BuyerLibrary::new(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryRecordStore::new()),
    ));

    // Declarative ownership edges; every buyer/account deletion path runs
    // through these.
    let cascade = Arc::new(CascadeRules::new(
        vec![library.clone(), board.clone(), feed.clone()],
        vec![suppliers.clone(), buyers.clone()],
    ));

    let projections = Projections {
        accounts,
        suppliers,
        buyers,
        products,
        categories,
        board,
        feed,
        admin_feed,
        library,
    };

    (projections, cascade)
}

/// Route one envelope to the projections that consume its stream.
///
/// Errors are logged and swallowed: the event is already durable, a feed or
/// read model that misses it can be rebuilt from the store.
fn route_envelope(projections: &Projections, cascade: &CascadeRules, env: &EventEnvelope<JsonValue>) {
    let results: Vec<(&str, Result<(), _>)> = match env.aggregate_type() {
        t if t == streams::ACCOUNT => vec![
            ("accounts", projections.accounts.apply_envelope(env)),
            ("admin_feed", projections.admin_feed.apply_envelope(env)),
            ("cascade", cascade.apply_envelope(env)),
        ],
        t if t == streams::SUPPLIER => vec![
            ("suppliers", projections.suppliers.apply_envelope(env)),
            ("feed", projections.feed.apply_envelope(env)),
            ("admin_feed", projections.admin_feed.apply_envelope(env)),
        ],
        t if t == streams::BUYER => vec![
            ("buyers", projections.buyers.apply_envelope(env)),
            ("cascade", cascade.apply_envelope(env)),
        ],
        t if t == streams::PRODUCT => vec![
            ("products", projections.products.apply_envelope(env)),
            ("categories", projections.categories.apply_envelope(env)),
            ("feed", projections.feed.apply_envelope(env)),
            ("admin_feed", projections.admin_feed.apply_envelope(env)),
        ],
        t if t == streams::INQUIRY => vec![
            ("board", projections.board.apply_envelope(env)),
            ("products", projections.products.apply_envelope(env)),
            ("feed", projections.feed.apply_envelope(env)),
            ("admin_feed", projections.admin_feed.apply_envelope(env)),
        ],
        _ => vec![],
    };

    for (name, result) in results {
        if let Err(e) = result {
            tracing::warn!(projection = name, "projection apply failed: {e}");
        }
    }
}

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        dispatcher: Arc<InMemoryDispatcher>,
        event_store: Arc<InMemoryEventStore>,
        projections: Projections,
        jwt: Arc<Hs256JwtCodec>,
    },
    #[cfg(feature = "postgres")]
    Persistent {
        dispatcher: Arc<PersistentDispatcher>,
        event_store: Arc<PostgresEventStore>,
        projections: Projections,
        jwt: Arc<Hs256JwtCodec>,
    },
}

pub async fn build_services(jwt_secret: String) -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let services = if use_persistent {
        #[cfg(feature = "postgres")]
        {
            build_persistent_services(jwt_secret).await
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
            build_in_memory_services(jwt_secret)
        }
    } else {
        build_in_memory_services(jwt_secret)
    };

    seed_admin(&services);
    services
}

fn build_in_memory_services(jwt_secret: String) -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let (projections, cascade) = build_projections();

    spawn_subscriber(&bus, projections.clone(), cascade);

    let dispatcher: Arc<InMemoryDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus));
    AppServices::InMemory {
        dispatcher,
        event_store: store,
        projections,
        jwt: Arc::new(Hs256JwtCodec::new(jwt_secret.as_bytes())),
    }
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(jwt_secret: String) -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");
    let store = Arc::new(PostgresEventStore::new(pool));

    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let (projections, cascade) = build_projections();

    // Read models are in-memory even on the persistent store: replay the
    // full history before serving.
    rebuild_read_models(&*store, &projections, &cascade).await;

    spawn_subscriber(&bus, projections.clone(), cascade);

    let dispatcher: Arc<PersistentDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus));
    AppServices::Persistent {
        dispatcher,
        event_store: store,
        projections,
        jwt: Arc::new(Hs256JwtCodec::new(jwt_secret.as_bytes())),
    }
}

#[cfg(feature = "postgres")]
async fn rebuild_read_models(
    store: &dyn EventQuery,
    projections: &Projections,
    cascade: &CascadeRules,
) {
    let mut events: Vec<StoredEvent> = Vec::new();
    let mut offset = 0u32;
    loop {
        let page = match store
            .query_events(EventFilter::default(), Pagination::new(Some(1000), Some(offset)))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("read-model rebuild query failed: {e}");
                return;
            }
        };
        let has_more = page.has_more;
        events.extend(page.events);
        if !has_more {
            break;
        }
        offset += 1000;
    }

    // Event ids are uuid v7 (time-ordered), giving a global replay order
    // that preserves every per-stream order.
    events.sort_by_key(|e| e.event_id);
    for event in &events {
        route_envelope(projections, cascade, &event.to_envelope());
    }
    tracing::info!(count = events.len(), "read models rebuilt from event store");
}

fn spawn_subscriber(bus: &Bus, projections: Projections, cascade: Arc<CascadeRules>) {
    let sub = bus.subscribe();
    tokio::task::spawn_blocking(move || {
        loop {
            match sub.recv() {
                Ok(env) => route_envelope(&projections, &cascade, &env),
                Err(_) => break,
            }
        }
    });
}

/// Create the administrator account if it does not exist yet.
///
/// Admin accounts cannot be self-registered; the single operator account is
/// seeded from the environment at startup. Admins may log in without email
/// verification.
fn seed_admin(services: &AppServices) {
    let email = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@tradepost.local".to_string())
        .to_lowercase();
    let password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "tradepost-admin".to_string());

    if services.projections().accounts.by_email(&email).is_some() {
        return;
    }

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("admin seed failed to hash password: {e}");
            return;
        }
    };

    let user_id = UserId::new();
    let now = Utc::now();
    let result = services.dispatch::<tradepost_identity::Account>(
        user_id.into(),
        streams::ACCOUNT,
        AccountCommand::Register(RegisterAccount {
            user_id,
            email: email.clone(),
            password_hash,
            role: Role::Admin,
            verification_token: TokenRecord {
                token: uuid::Uuid::new_v4(),
                expires_at: now + Duration::hours(24),
            },
            occurred_at: now,
        }),
        |agg| tradepost_identity::Account::empty(UserId::from(agg)),
    );

    match result {
        Ok(_) => tracing::info!(email, "seeded admin account"),
        Err(e) => tracing::error!("admin seed failed: {e:?}"),
    }
}

impl AppServices {
    pub fn projections(&self) -> &Projections {
        match self {
            AppServices::InMemory { projections, .. } => projections,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { projections, .. } => projections,
        }
    }

    pub fn jwt(&self) -> &Arc<Hs256JwtCodec> {
        match self {
            AppServices::InMemory { jwt, .. } => jwt,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { jwt, .. } => jwt,
        }
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt().clone()
    }

    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: tradepost_core::Aggregate<Error = DomainError>,
        A::Event: tradepost_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        match self {
            AppServices::InMemory { dispatcher, .. } => {
                dispatcher.dispatch::<A>(aggregate_id, aggregate_type, command, make_aggregate)
            }
            #[cfg(feature = "postgres")]
            AppServices::Persistent { dispatcher, .. } => {
                dispatcher.dispatch::<A>(aggregate_id, aggregate_type, command, make_aggregate)
            }
        }
    }

    /// Moderation audit: query stored events with filters and pagination.
    pub async fn query_events(
        &self,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, tradepost_infra::event_store::EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.query_events(filter, pagination).await
            }
            #[cfg(feature = "postgres")]
            AppServices::Persistent { event_store, .. } => {
                event_store.query_events(filter, pagination).await
            }
        }
    }
}
