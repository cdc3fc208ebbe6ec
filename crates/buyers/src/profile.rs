use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use tradepost_events::Event;

/// Buyer profile identifier (reuses the account uuid, see `SupplierId`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyerId(pub AggregateId);

impl BuyerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn user_id(&self) -> UserId {
        UserId::from(self.0)
    }
}

impl From<UserId> for BuyerId {
    fn from(value: UserId) -> Self {
        Self(AggregateId::from(value))
    }
}

impl core::fmt::Display for BuyerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Buyer lifecycle: `Active ⇄ Suspended`; deletion is hard (cascaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyerStatus {
    Active,
    Suspended,
}

impl BuyerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerStatus::Active => "active",
            BuyerStatus::Suspended => "suspended",
        }
    }
}

/// Aggregate root: buyer profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerProfile {
    id: BuyerId,
    user_id: UserId,
    company_name: Option<String>,
    contact_email: Option<String>,
    status: BuyerStatus,
    suspension_reason: Option<String>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl BuyerProfile {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: BuyerId) -> Self {
        Self {
            id,
            user_id: id.user_id(),
            company_name: None,
            contact_email: None,
            status: BuyerStatus::Active,
            suspension_reason: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> BuyerId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn status(&self) -> BuyerStatus {
        self.status
    }

    pub fn suspension_reason(&self) -> Option<&str> {
        self.suspension_reason.as_deref()
    }

    /// Suspended buyers cannot submit inquiries or reply.
    pub fn can_transact(&self) -> bool {
        self.status == BuyerStatus::Active && !self.deleted
    }
}

impl AggregateRoot for BuyerProfile {
    type Id = BuyerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: create the profile at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBuyer {
    pub buyer_id: BuyerId,
    pub user_id: UserId,
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: update profile details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBuyerDetails {
    pub buyer_id: BuyerId,
    /// Optional new company name (if None, keep existing).
    pub company_name: Option<String>,
    /// Optional new contact email (if None, keep existing).
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendBuyer {
    pub buyer_id: BuyerId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: lift a suspension. Idempotent on an already-active profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateBuyer {
    pub buyer_id: BuyerId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: hard delete. The caller runs the ownership cascade afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBuyer {
    pub buyer_id: BuyerId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyerCommand {
    Create(CreateBuyer),
    UpdateDetails(UpdateBuyerDetails),
    Suspend(SuspendBuyer),
    Activate(ActivateBuyer),
    Delete(DeleteBuyer),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerCreated {
    pub buyer_id: BuyerId,
    pub user_id: UserId,
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDetailsUpdated {
    pub buyer_id: BuyerId,
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSuspended {
    pub buyer_id: BuyerId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerActivated {
    pub buyer_id: BuyerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDeleted {
    pub buyer_id: BuyerId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyerEvent {
    Created(BuyerCreated),
    DetailsUpdated(BuyerDetailsUpdated),
    Suspended(BuyerSuspended),
    Activated(BuyerActivated),
    Deleted(BuyerDeleted),
}

impl Event for BuyerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BuyerEvent::Created(_) => "buyers.profile.created",
            BuyerEvent::DetailsUpdated(_) => "buyers.profile.details_updated",
            BuyerEvent::Suspended(_) => "buyers.profile.suspended",
            BuyerEvent::Activated(_) => "buyers.profile.activated",
            BuyerEvent::Deleted(_) => "buyers.profile.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BuyerEvent::Created(e) => e.occurred_at,
            BuyerEvent::DetailsUpdated(e) => e.occurred_at,
            BuyerEvent::Suspended(e) => e.occurred_at,
            BuyerEvent::Activated(e) => e.occurred_at,
            BuyerEvent::Deleted(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for BuyerProfile {
    type Command = BuyerCommand;
    type Event = BuyerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BuyerEvent::Created(e) => {
                self.id = e.buyer_id;
                self.user_id = e.user_id;
                self.contact_email = e.contact_email.clone();
                self.status = BuyerStatus::Active;
                self.created = true;
            }
            BuyerEvent::DetailsUpdated(e) => {
                if e.company_name.is_some() {
                    self.company_name = e.company_name.clone();
                }
                if e.contact_email.is_some() {
                    self.contact_email = e.contact_email.clone();
                }
            }
            BuyerEvent::Suspended(e) => {
                self.status = BuyerStatus::Suspended;
                self.suspension_reason = e.reason.clone();
            }
            BuyerEvent::Activated(_) => {
                self.status = BuyerStatus::Active;
                self.suspension_reason = None;
            }
            BuyerEvent::Deleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BuyerCommand::Create(cmd) => self.handle_create(cmd),
            BuyerCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            BuyerCommand::Suspend(cmd) => self.handle_suspend(cmd),
            BuyerCommand::Activate(cmd) => self.handle_activate(cmd),
            BuyerCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl BuyerProfile {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateBuyer) -> Result<Vec<BuyerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("profile already exists"));
        }

        Ok(vec![BuyerEvent::Created(BuyerCreated {
            buyer_id: cmd.buyer_id,
            user_id: cmd.user_id,
            contact_email: cmd.contact_email.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateBuyerDetails) -> Result<Vec<BuyerEvent>, DomainError> {
        self.ensure_live()?;

        if let Some(name) = &cmd.company_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("company name cannot be empty"));
            }
        }

        Ok(vec![BuyerEvent::DetailsUpdated(BuyerDetailsUpdated {
            buyer_id: cmd.buyer_id,
            company_name: cmd.company_name.clone(),
            contact_email: cmd.contact_email.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendBuyer) -> Result<Vec<BuyerEvent>, DomainError> {
        self.ensure_live()?;

        if self.status == BuyerStatus::Suspended {
            return Err(DomainError::conflict("buyer is already suspended"));
        }

        Ok(vec![BuyerEvent::Suspended(BuyerSuspended {
            buyer_id: cmd.buyer_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateBuyer) -> Result<Vec<BuyerEvent>, DomainError> {
        self.ensure_live()?;

        match self.status {
            // Idempotent: re-activating an active buyer is a no-op.
            BuyerStatus::Active => Ok(vec![]),
            BuyerStatus::Suspended => Ok(vec![BuyerEvent::Activated(BuyerActivated {
                buyer_id: cmd.buyer_id,
                occurred_at: cmd.occurred_at,
            })]),
        }
    }

    fn handle_delete(&self, cmd: &DeleteBuyer) -> Result<Vec<BuyerEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![BuyerEvent::Deleted(BuyerDeleted {
            buyer_id: cmd.buyer_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
