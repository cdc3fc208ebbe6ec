//! User account aggregate (event-sourced).
//!
//! Covers registration, email verification, password reset, and the
//! supersede-on-reregistration policy: an unverified account is deleted when
//! the same email registers again, so an abandoned verification never locks
//! an address out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradepost_auth::Role;
use tradepost_core::{Aggregate, AggregateRoot, DomainError, UserId};
use tradepost_events::Event;

// ─────────────────────────────────────────────────────────────────────────────
// Token record
// ─────────────────────────────────────────────────────────────────────────────

/// A single-use token with an expiry (email verification, password reset).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn matches(&self, token: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.token != token {
            return Err(DomainError::validation("invalid token"));
        }
        if now >= self.expires_at {
            return Err(DomainError::validation("token expired"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// User account aggregate.
///
/// # Invariants
/// - Exactly one role per account, fixed at registration.
/// - Admin accounts are always considered approved.
/// - Email verification implies approval (documented coupling, not a
///   general approval queue).
/// - A verified account cannot be superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
    pub email_verified: bool,
    pub verification_token: Option<TokenRecord>,
    pub reset_token: Option<TokenRecord>,
    pub version: u64,
    pub created: bool,
    pub deleted: bool,
}

impl Account {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            password_hash: String::new(),
            role: Role::Buyer,
            approved: false,
            email_verified: false,
            verification_token: None,
            reset_token: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}

impl AggregateRoot for Account {
    type Id = UserId;

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

/// Command to register a new account.
///
/// The password is hashed by the caller; aggregates stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAccount {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verification_token: TokenRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Command to verify the account email with a previously issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmail {
    pub user_id: UserId,
    pub token: Uuid,
    pub occurred_at: DateTime<Utc>,
}

/// Command to issue a password-reset token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPasswordReset {
    pub user_id: UserId,
    pub reset_token: TokenRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Command to consume a reset token and set a new password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPassword {
    pub user_id: UserId,
    pub token: Uuid,
    pub new_password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command to supersede an unverified account (re-registration policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersedeAccount {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to delete an account (cascade entry point).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccount {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    Register(RegisterAccount),
    VerifyEmail(VerifyEmail),
    RequestPasswordReset(RequestPasswordReset),
    ResetPassword(ResetPassword),
    Supersede(SupersedeAccount),
    Delete(DeleteAccount),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRegistered {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verification_token: TokenRecord,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerified {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetRequested {
    pub user_id: UserId,
    pub reset_token: TokenRecord,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub user_id: UserId,
    pub new_password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSuperseded {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeleted {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    Registered(AccountRegistered),
    EmailVerified(EmailVerified),
    PasswordResetRequested(PasswordResetRequested),
    PasswordReset(PasswordReset),
    Superseded(AccountSuperseded),
    Deleted(AccountDeleted),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Registered(_) => "identity.account.registered",
            AccountEvent::EmailVerified(_) => "identity.account.email_verified",
            AccountEvent::PasswordResetRequested(_) => "identity.account.password_reset_requested",
            AccountEvent::PasswordReset(_) => "identity.account.password_reset",
            AccountEvent::Superseded(_) => "identity.account.superseded",
            AccountEvent::Deleted(_) => "identity.account.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Registered(e) => e.occurred_at,
            AccountEvent::EmailVerified(e) => e.occurred_at,
            AccountEvent::PasswordResetRequested(e) => e.occurred_at,
            AccountEvent::PasswordReset(e) => e.occurred_at,
            AccountEvent::Superseded(e) => e.occurred_at,
            AccountEvent::Deleted(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::Registered(e) => {
                self.id = e.user_id;
                self.email = e.email.clone();
                self.password_hash = e.password_hash.clone();
                self.role = e.role;
                // Admin accounts are always considered approved.
                self.approved = e.role.is_admin();
                self.email_verified = false;
                self.verification_token = Some(e.verification_token);
                self.created = true;
            }
            AccountEvent::EmailVerified(_) => {
                self.email_verified = true;
                self.approved = true;
                self.verification_token = None;
            }
            AccountEvent::PasswordResetRequested(e) => {
                self.reset_token = Some(e.reset_token);
            }
            AccountEvent::PasswordReset(e) => {
                self.password_hash = e.new_password_hash.clone();
                self.reset_token = None;
            }
            AccountEvent::Superseded(_) | AccountEvent::Deleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Register(cmd) => self.handle_register(cmd),
            AccountCommand::VerifyEmail(cmd) => self.handle_verify_email(cmd),
            AccountCommand::RequestPasswordReset(cmd) => self.handle_request_reset(cmd),
            AccountCommand::ResetPassword(cmd) => self.handle_reset_password(cmd),
            AccountCommand::Supersede(cmd) => self.handle_supersede(cmd),
            AccountCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Account {
    fn handle_register(&self, cmd: &RegisterAccount) -> Result<Vec<AccountEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("account already exists"));
        }

        let email = cmd.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }

        Ok(vec![AccountEvent::Registered(AccountRegistered {
            user_id: cmd.user_id,
            email,
            password_hash: cmd.password_hash.clone(),
            role: cmd.role,
            verification_token: cmd.verification_token,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_verify_email(&self, cmd: &VerifyEmail) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_live()?;

        if self.email_verified {
            return Err(DomainError::invariant("email already verified"));
        }

        let record = self
            .verification_token
            .ok_or_else(|| DomainError::validation("no verification token issued"))?;
        record.matches(cmd.token, cmd.occurred_at)?;

        Ok(vec![AccountEvent::EmailVerified(EmailVerified {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_reset(
        &self,
        cmd: &RequestPasswordReset,
    ) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![AccountEvent::PasswordResetRequested(
            PasswordResetRequested {
                user_id: cmd.user_id,
                reset_token: cmd.reset_token,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reset_password(&self, cmd: &ResetPassword) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.new_password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }

        let record = self
            .reset_token
            .ok_or_else(|| DomainError::validation("no reset token issued"))?;
        record.matches(cmd.token, cmd.occurred_at)?;

        Ok(vec![AccountEvent::PasswordReset(PasswordReset {
            user_id: cmd.user_id,
            new_password_hash: cmd.new_password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_supersede(&self, cmd: &SupersedeAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_live()?;

        if self.email_verified {
            return Err(DomainError::invariant(
                "verified accounts cannot be superseded",
            ));
        }

        Ok(vec![AccountEvent::Superseded(AccountSuperseded {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![AccountEvent::Deleted(AccountDeleted {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
