use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use tradepost_events::Event;

/// Supplier profile identifier.
///
/// Profiles are one-to-one with accounts; the profile id reuses the account
/// uuid (streams are disambiguated by aggregate type).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn user_id(&self) -> UserId {
        UserId::from(self.0)
    }
}

impl From<UserId> for SupplierId {
    fn from(value: UserId) -> Self {
        Self(AggregateId::from(value))
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier moderation lifecycle.
///
/// ```text
/// PendingApproval → { Active, Rejected }
/// Active ⇄ Suspended
/// Rejected → PendingApproval        (restore / onboarding resubmission)
/// any non-deleted → Deleted         (soft)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierStatus {
    PendingApproval,
    Active,
    Rejected,
    Suspended,
    Deleted,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::PendingApproval => "pending_approval",
            SupplierStatus::Active => "active",
            SupplierStatus::Rejected => "rejected",
            SupplierStatus::Suspended => "suspended",
            SupplierStatus::Deleted => "deleted",
        }
    }
}

/// Company metadata collected during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompanyDetails {
    pub company_name: String,
    pub business_registration: Option<String>,
    pub legal_entity_type: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

/// Contact information for a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A recorded moderation action (actor + reason + time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationStamp {
    pub actor: UserId,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Aggregate root: supplier profile.
///
/// # Invariants
/// - `verified == true` implies status is neither Rejected nor Deleted.
/// - A deleted profile accepts no further commands.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierProfile {
    id: SupplierId,
    user_id: UserId,
    company: CompanyDetails,
    contact: ContactInfo,
    status: SupplierStatus,
    verified: bool,
    rating: u8,
    onboarding_completed: bool,
    onboarding_draft: Option<serde_json::Value>,
    rejection: Option<ModerationStamp>,
    suspension: Option<ModerationStamp>,
    version: u64,
    created: bool,
}

impl SupplierProfile {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SupplierId) -> Self {
        Self {
            id,
            user_id: id.user_id(),
            company: CompanyDetails::default(),
            contact: ContactInfo::default(),
            status: SupplierStatus::PendingApproval,
            verified: false,
            rating: 0,
            onboarding_completed: false,
            onboarding_draft: None,
            rejection: None,
            suspension: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn company(&self) -> &CompanyDetails {
        &self.company
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn onboarding_completed(&self) -> bool {
        self.onboarding_completed
    }

    pub fn onboarding_draft(&self) -> Option<&serde_json::Value> {
        self.onboarding_draft.as_ref()
    }

    pub fn rejection(&self) -> Option<&ModerationStamp> {
        self.rejection.as_ref()
    }

    pub fn suspension(&self) -> Option<&ModerationStamp> {
        self.suspension.as_ref()
    }

    /// Invariant helper: whether this supplier may appear in public surfaces
    /// and transact (list products, receive inquiries).
    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }
}

impl AggregateRoot for SupplierProfile {
    type Id = SupplierId;

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

/// Command: create the (empty) profile at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProfile {
    pub supplier_id: SupplierId,
    pub user_id: UserId,
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: save an onboarding draft (free-form wizard state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOnboardingDraft {
    pub supplier_id: SupplierId,
    pub draft: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Command: submit onboarding for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOnboarding {
    pub supplier_id: SupplierId,
    pub company: CompanyDetails,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveProfile {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin rejection (reason required).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectProfile {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin suspension.
///
/// A non-empty reason is enforced by the caller, not here (the API boundary
/// owns input validation for moderation forms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendProfile {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: lift a suspension. Idempotent on an already-active profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProfile {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: soft delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProfile {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: restore a rejected profile to the review queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreProfile {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SupplierCommand {
    Create(CreateProfile),
    SaveDraft(SaveOnboardingDraft),
    SubmitOnboarding(SubmitOnboarding),
    Approve(ApproveProfile),
    Reject(RejectProfile),
    Suspend(SuspendProfile),
    Activate(ActivateProfile),
    Delete(DeleteProfile),
    Restore(RestoreProfile),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCreated {
    pub supplier_id: SupplierId,
    pub user_id: UserId,
    pub contact_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingDraftSaved {
    pub supplier_id: SupplierId,
    pub draft: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSubmitted {
    pub supplier_id: SupplierId,
    pub company: CompanyDetails,
    pub contact: ContactInfo,
    /// True when this submission re-enters review after a rejection.
    pub resubmission: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileApproved {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRejected {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSuspended {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileActivated {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDeleted {
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRestored {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SupplierEvent {
    Created(ProfileCreated),
    DraftSaved(OnboardingDraftSaved),
    OnboardingSubmitted(OnboardingSubmitted),
    Approved(ProfileApproved),
    Rejected(ProfileRejected),
    Suspended(ProfileSuspended),
    Activated(ProfileActivated),
    Deleted(ProfileDeleted),
    Restored(ProfileRestored),
}

impl Event for SupplierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierEvent::Created(_) => "suppliers.profile.created",
            SupplierEvent::DraftSaved(_) => "suppliers.profile.draft_saved",
            SupplierEvent::OnboardingSubmitted(_) => "suppliers.profile.onboarding_submitted",
            SupplierEvent::Approved(_) => "suppliers.profile.approved",
            SupplierEvent::Rejected(_) => "suppliers.profile.rejected",
            SupplierEvent::Suspended(_) => "suppliers.profile.suspended",
            SupplierEvent::Activated(_) => "suppliers.profile.activated",
            SupplierEvent::Deleted(_) => "suppliers.profile.deleted",
            SupplierEvent::Restored(_) => "suppliers.profile.restored",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierEvent::Created(e) => e.occurred_at,
            SupplierEvent::DraftSaved(e) => e.occurred_at,
            SupplierEvent::OnboardingSubmitted(e) => e.occurred_at,
            SupplierEvent::Approved(e) => e.occurred_at,
            SupplierEvent::Rejected(e) => e.occurred_at,
            SupplierEvent::Suspended(e) => e.occurred_at,
            SupplierEvent::Activated(e) => e.occurred_at,
            SupplierEvent::Deleted(e) => e.occurred_at,
            SupplierEvent::Restored(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for SupplierProfile {
    type Command = SupplierCommand;
    type Event = SupplierEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierEvent::Created(e) => {
                self.id = e.supplier_id;
                self.user_id = e.user_id;
                self.contact.email = e.contact_email.clone();
                self.status = SupplierStatus::PendingApproval;
                self.verified = false;
                self.onboarding_completed = false;
                self.created = true;
            }
            SupplierEvent::DraftSaved(e) => {
                self.onboarding_draft = Some(e.draft.clone());
            }
            SupplierEvent::OnboardingSubmitted(e) => {
                self.company = e.company.clone();
                self.contact = e.contact.clone();
                self.onboarding_completed = true;
                self.onboarding_draft = None;
                self.status = SupplierStatus::PendingApproval;
                self.verified = false;
                self.rejection = None;
            }
            SupplierEvent::Approved(_) => {
                self.status = SupplierStatus::Active;
                self.verified = true;
                self.rejection = None;
            }
            SupplierEvent::Rejected(e) => {
                self.status = SupplierStatus::Rejected;
                self.verified = false;
                self.rejection = Some(ModerationStamp {
                    actor: e.actor,
                    reason: Some(e.reason.clone()),
                    at: e.occurred_at,
                });
            }
            SupplierEvent::Suspended(e) => {
                self.status = SupplierStatus::Suspended;
                self.suspension = Some(ModerationStamp {
                    actor: e.actor,
                    reason: e.reason.clone(),
                    at: e.occurred_at,
                });
            }
            SupplierEvent::Activated(_) => {
                self.status = SupplierStatus::Active;
                self.suspension = None;
            }
            SupplierEvent::Deleted(e) => {
                self.status = SupplierStatus::Deleted;
                self.verified = false;
                self.suspension = Some(ModerationStamp {
                    actor: e.actor,
                    reason: None,
                    at: e.occurred_at,
                });
            }
            SupplierEvent::Restored(_) => {
                self.status = SupplierStatus::PendingApproval;
                self.verified = false;
                self.rejection = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierCommand::Create(cmd) => self.handle_create(cmd),
            SupplierCommand::SaveDraft(cmd) => self.handle_save_draft(cmd),
            SupplierCommand::SubmitOnboarding(cmd) => self.handle_submit(cmd),
            SupplierCommand::Approve(cmd) => self.handle_approve(cmd),
            SupplierCommand::Reject(cmd) => self.handle_reject(cmd),
            SupplierCommand::Suspend(cmd) => self.handle_suspend(cmd),
            SupplierCommand::Activate(cmd) => self.handle_activate(cmd),
            SupplierCommand::Delete(cmd) => self.handle_delete(cmd),
            SupplierCommand::Restore(cmd) => self.handle_restore(cmd),
        }
    }
}

impl SupplierProfile {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        if self.status == SupplierStatus::Deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("profile already exists"));
        }

        Ok(vec![SupplierEvent::Created(ProfileCreated {
            supplier_id: cmd.supplier_id,
            user_id: cmd.user_id,
            contact_email: cmd.contact_email.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_save_draft(&self, cmd: &SaveOnboardingDraft) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        match self.status {
            SupplierStatus::PendingApproval | SupplierStatus::Rejected => {
                Ok(vec![SupplierEvent::DraftSaved(OnboardingDraftSaved {
                    supplier_id: cmd.supplier_id,
                    draft: cmd.draft.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            other => Err(DomainError::illegal_transition(format!(
                "onboarding drafts cannot be saved while {}",
                other.as_str()
            ))),
        }
    }

    fn handle_submit(&self, cmd: &SubmitOnboarding) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.company.company_name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }

        match self.status {
            SupplierStatus::PendingApproval | SupplierStatus::Rejected => {
                Ok(vec![SupplierEvent::OnboardingSubmitted(OnboardingSubmitted {
                    supplier_id: cmd.supplier_id,
                    company: cmd.company.clone(),
                    contact: cmd.contact.clone(),
                    resubmission: self.status == SupplierStatus::Rejected,
                    occurred_at: cmd.occurred_at,
                })])
            }
            other => Err(DomainError::illegal_transition(format!(
                "onboarding cannot be submitted while {}",
                other.as_str()
            ))),
        }
    }

    fn handle_approve(&self, cmd: &ApproveProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        if self.status != SupplierStatus::PendingApproval {
            return Err(DomainError::illegal_transition(format!(
                "only pending_approval profiles can be approved (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![SupplierEvent::Approved(ProfileApproved {
            supplier_id: cmd.supplier_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("rejection reason cannot be empty"));
        }
        if self.status != SupplierStatus::PendingApproval {
            return Err(DomainError::illegal_transition(format!(
                "only pending_approval profiles can be rejected (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![SupplierEvent::Rejected(ProfileRejected {
            supplier_id: cmd.supplier_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        if self.status != SupplierStatus::Active {
            return Err(DomainError::illegal_transition(format!(
                "only active profiles can be suspended (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![SupplierEvent::Suspended(ProfileSuspended {
            supplier_id: cmd.supplier_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        match self.status {
            // Idempotent: re-activating an active profile is a no-op.
            SupplierStatus::Active => Ok(vec![]),
            SupplierStatus::Suspended => Ok(vec![SupplierEvent::Activated(ProfileActivated {
                supplier_id: cmd.supplier_id,
                occurred_at: cmd.occurred_at,
            })]),
            other => Err(DomainError::illegal_transition(format!(
                "only suspended profiles can be activated (currently {})",
                other.as_str()
            ))),
        }
    }

    fn handle_delete(&self, cmd: &DeleteProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![SupplierEvent::Deleted(ProfileDeleted {
            supplier_id: cmd.supplier_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restore(&self, cmd: &RestoreProfile) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live()?;

        if self.status != SupplierStatus::Rejected {
            return Err(DomainError::illegal_transition(format!(
                "only rejected profiles can be restored (currently {})",
                self.status.as_str()
            )));
        }

        Ok(vec![SupplierEvent::Restored(ProfileRestored {
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
