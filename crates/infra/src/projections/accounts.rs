use serde_json::Value as JsonValue;

use chrono::{DateTime, Utc};
use tradepost_auth::Role;
use tradepost_core::UserId;
use tradepost_events::EventEnvelope;
use tradepost_identity::{AccountEvent, TokenRecord};

use crate::projections::{CursorDecision, ProjectionError, StreamCursors};
use crate::read_model::RecordStore;
use crate::streams;

/// Queryable account read model (login, token lookups, admin user list).
///
/// Carries the password hash so login can verify credentials without
/// rehydrating the aggregate; the HTTP layer never serializes it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
    pub email_verified: bool,
    pub verification_token: Option<TokenRecord>,
    pub reset_token: Option<TokenRecord>,
    pub registered_at: DateTime<Utc>,
}

/// Account directory projection.
#[derive(Debug)]
pub struct AccountsProjection<S>
where
    S: RecordStore<UserId, AccountRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> AccountsProjection<S>
where
    S: RecordStore<UserId, AccountRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<AccountRecord> {
        self.store.get(user_id)
    }

    /// Lookup by (lowercased) email.
    pub fn by_email(&self, email: &str) -> Option<AccountRecord> {
        let needle = email.trim().to_lowercase();
        self.store.list().into_iter().find(|r| r.email == needle)
    }

    pub fn by_verification_token(&self, token: uuid::Uuid) -> Option<AccountRecord> {
        self.store
            .list()
            .into_iter()
            .find(|r| r.verification_token.is_some_and(|t| t.token == token))
    }

    pub fn by_reset_token(&self, token: uuid::Uuid) -> Option<AccountRecord> {
        self.store
            .list()
            .into_iter()
            .find(|r| r.reset_token.is_some_and(|t| t.token == token))
    }

    pub fn list(&self) -> Vec<AccountRecord> {
        self.store.list()
    }

    /// Apply a published envelope into the projection.
    ///
    /// Ignores non-account aggregates (the bus is shared across modules);
    /// idempotent under at-least-once delivery via the stream cursor.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::ACCOUNT {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if self.cursors.decide(aggregate_id, seq)? == CursorDecision::Skip {
            return Ok(());
        }

        let event: AccountEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            AccountEvent::Registered(e) => {
                self.store.upsert(
                    e.user_id,
                    AccountRecord {
                        user_id: e.user_id,
                        email: e.email,
                        password_hash: e.password_hash,
                        role: e.role,
                        approved: e.role.is_admin(),
                        email_verified: false,
                        verification_token: Some(e.verification_token),
                        reset_token: None,
                        registered_at: e.occurred_at,
                    },
                );
            }
            AccountEvent::EmailVerified(e) => {
                if let Some(mut record) = self.store.get(&e.user_id) {
                    record.email_verified = true;
                    record.approved = true;
                    record.verification_token = None;
                    self.store.upsert(e.user_id, record);
                }
            }
            AccountEvent::PasswordResetRequested(e) => {
                if let Some(mut record) = self.store.get(&e.user_id) {
                    record.reset_token = Some(e.reset_token);
                    self.store.upsert(e.user_id, record);
                }
            }
            AccountEvent::PasswordReset(e) => {
                if let Some(mut record) = self.store.get(&e.user_id) {
                    record.password_hash = e.new_password_hash;
                    record.reset_token = None;
                    self.store.upsert(e.user_id, record);
                }
            }
            AccountEvent::Superseded(e) | AccountEvent::Deleted(e) => {
                self.store.remove(&e.user_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
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
