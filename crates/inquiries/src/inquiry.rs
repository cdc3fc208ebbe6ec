use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_buyers::BuyerId;
use tradepost_catalog::ProductId;
use tradepost_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use tradepost_events::Event;
use tradepost_suppliers::SupplierId;

/// Inquiry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InquiryId(pub AggregateId);

impl InquiryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InquiryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Conversation state between buyer and supplier.
///
/// ```text
/// Pending → Replied            (first reply by either party)
/// any → Deleted                (supplier soft delete)
/// Deleted → Replied | Pending  (recover; Replied iff a supplier reply exists)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    Replied,
    Deleted,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::Replied => "replied",
            ConversationStatus::Deleted => "deleted",
        }
    }
}

/// Admin gate: whether the conversation is visible at all.
///
/// Re-approval after a rejection is allowed; there is no terminal state.
/// Every approve/reject flip clears the buyer reply (re-engagement reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl InquiryApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryApprovalStatus::Pending => "pending",
            InquiryApprovalStatus::Approved => "approved",
            InquiryApprovalStatus::Rejected => "rejected",
        }
    }
}

/// A reply message with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Aggregate root: inquiry.
///
/// # Invariants
/// - Replies require `approval == Approved` and a live conversation.
/// - `buyer_reply` is cleared whenever the approval status flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    id: InquiryId,
    buyer_id: BuyerId,
    supplier_id: SupplierId,
    product_id: Option<ProductId>,
    subject: String,
    message: String,
    conversation: ConversationStatus,
    approval: InquiryApprovalStatus,
    supplier_reply: Option<Reply>,
    buyer_reply: Option<Reply>,
    rejection_reason: Option<String>,
    version: u64,
    created: bool,
}

impl Inquiry {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InquiryId) -> Self {
        Self {
            id,
            buyer_id: BuyerId::new(AggregateId::from_uuid(uuid_nil())),
            supplier_id: SupplierId::new(AggregateId::from_uuid(uuid_nil())),
            product_id: None,
            subject: String::new(),
            message: String::new(),
            conversation: ConversationStatus::Pending,
            approval: InquiryApprovalStatus::Pending,
            supplier_reply: None,
            buyer_reply: None,
            rejection_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InquiryId {
        self.id
    }

    pub fn buyer_id(&self) -> BuyerId {
        self.buyer_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn conversation(&self) -> ConversationStatus {
        self.conversation
    }

    pub fn approval(&self) -> InquiryApprovalStatus {
        self.approval
    }

    pub fn supplier_reply(&self) -> Option<&Reply> {
        self.supplier_reply.as_ref()
    }

    pub fn buyer_reply(&self) -> Option<&Reply> {
        self.buyer_reply.as_ref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }
}

fn uuid_nil() -> uuid::Uuid {
    uuid::Uuid::nil()
}

impl AggregateRoot for Inquiry {
    type Id = InquiryId;

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

/// Command: buyer submits an inquiry to a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitInquiry {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub product_id: Option<ProductId>,
    pub subject: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin approves the inquiry for both parties to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveInquiry {
    pub inquiry_id: InquiryId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: admin rejects the inquiry (reason required).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectInquiry {
    pub inquiry_id: InquiryId,
    pub actor: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier replies to an approved inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAsSupplier {
    pub inquiry_id: InquiryId,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: buyer follows up on an approved inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAsBuyer {
    pub inquiry_id: InquiryId,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier soft-deletes the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInquiry {
    pub inquiry_id: InquiryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: supplier recovers a soft-deleted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverInquiry {
    pub inquiry_id: InquiryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryCommand {
    Submit(SubmitInquiry),
    Approve(ApproveInquiry),
    Reject(RejectInquiry),
    ReplyAsSupplier(ReplyAsSupplier),
    ReplyAsBuyer(ReplyAsBuyer),
    Delete(DeleteInquiry),
    Recover(RecoverInquiry),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquirySubmitted {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub product_id: Option<ProductId>,
    pub subject: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryApproved {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    /// True when this approval follows a prior rejection.
    pub reapproval: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryRejected {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub actor: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierReplied {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerReplied {
    pub inquiry_id: InquiryId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryDeleted {
    pub inquiry_id: InquiryId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryRecovered {
    pub inquiry_id: InquiryId,
    pub supplier_id: SupplierId,
    /// Conversation state after recovery (Replied iff a supplier reply exists).
    pub restored_to: ConversationStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryEvent {
    Submitted(InquirySubmitted),
    Approved(InquiryApproved),
    Rejected(InquiryRejected),
    SupplierReplied(SupplierReplied),
    BuyerReplied(BuyerReplied),
    Deleted(InquiryDeleted),
    Recovered(InquiryRecovered),
}

impl Event for InquiryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InquiryEvent::Submitted(_) => "inquiries.inquiry.submitted",
            InquiryEvent::Approved(_) => "inquiries.inquiry.approved",
            InquiryEvent::Rejected(_) => "inquiries.inquiry.rejected",
            InquiryEvent::SupplierReplied(_) => "inquiries.inquiry.supplier_replied",
            InquiryEvent::BuyerReplied(_) => "inquiries.inquiry.buyer_replied",
            InquiryEvent::Deleted(_) => "inquiries.inquiry.deleted",
            InquiryEvent::Recovered(_) => "inquiries.inquiry.recovered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InquiryEvent::Submitted(e) => e.occurred_at,
            InquiryEvent::Approved(e) => e.occurred_at,
            InquiryEvent::Rejected(e) => e.occurred_at,
            InquiryEvent::SupplierReplied(e) => e.occurred_at,
            InquiryEvent::BuyerReplied(e) => e.occurred_at,
            InquiryEvent::Deleted(e) => e.occurred_at,
            InquiryEvent::Recovered(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Inquiry {
    type Command = InquiryCommand;
    type Event = InquiryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InquiryEvent::Submitted(e) => {
                self.id = e.inquiry_id;
                self.buyer_id = e.buyer_id;
                self.supplier_id = e.supplier_id;
                self.product_id = e.product_id;
                self.subject = e.subject.clone();
                self.message = e.message.clone();
                self.conversation = ConversationStatus::Pending;
                self.approval = InquiryApprovalStatus::Pending;
                self.created = true;
            }
            InquiryEvent::Approved(_) => {
                self.approval = InquiryApprovalStatus::Approved;
                self.rejection_reason = None;
                // Re-engagement reset: the buyer must follow up afresh.
                self.buyer_reply = None;
            }
            InquiryEvent::Rejected(e) => {
                self.approval = InquiryApprovalStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                self.buyer_reply = None;
            }
            InquiryEvent::SupplierReplied(e) => {
                self.supplier_reply = Some(Reply {
                    message: e.message.clone(),
                    at: e.occurred_at,
                });
                self.conversation = ConversationStatus::Replied;
            }
            InquiryEvent::BuyerReplied(e) => {
                self.buyer_reply = Some(Reply {
                    message: e.message.clone(),
                    at: e.occurred_at,
                });
                self.conversation = ConversationStatus::Replied;
            }
            InquiryEvent::Deleted(_) => {
                self.conversation = ConversationStatus::Deleted;
            }
            InquiryEvent::Recovered(e) => {
                self.conversation = e.restored_to;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InquiryCommand::Submit(cmd) => self.handle_submit(cmd),
            InquiryCommand::Approve(cmd) => self.handle_approve(cmd),
            InquiryCommand::Reject(cmd) => self.handle_reject(cmd),
            InquiryCommand::ReplyAsSupplier(cmd) => self.handle_supplier_reply(cmd),
            InquiryCommand::ReplyAsBuyer(cmd) => self.handle_buyer_reply(cmd),
            InquiryCommand::Delete(cmd) => self.handle_delete(cmd),
            InquiryCommand::Recover(cmd) => self.handle_recover(cmd),
        }
    }
}

impl Inquiry {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_conversation_open(&self) -> Result<(), DomainError> {
        self.ensure_live()?;
        if self.conversation == ConversationStatus::Deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_replyable(&self) -> Result<(), DomainError> {
        self.ensure_conversation_open()?;
        if self.approval != InquiryApprovalStatus::Approved {
            return Err(DomainError::invariant(
                "replies require an approved inquiry",
            ));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitInquiry) -> Result<Vec<InquiryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("inquiry already exists"));
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("inquiry message cannot be empty"));
        }

        Ok(vec![InquiryEvent::Submitted(InquirySubmitted {
            inquiry_id: cmd.inquiry_id,
            buyer_id: cmd.buyer_id,
            supplier_id: cmd.supplier_id,
            product_id: cmd.product_id,
            subject: cmd.subject.trim().to_string(),
            message: cmd.message.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveInquiry) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_conversation_open()?;

        match self.approval {
            InquiryApprovalStatus::Approved => Err(DomainError::conflict(
                "inquiry is already approved",
            )),
            // Re-approval after rejection is allowed (flapping permitted).
            InquiryApprovalStatus::Pending | InquiryApprovalStatus::Rejected => {
                Ok(vec![InquiryEvent::Approved(InquiryApproved {
                    inquiry_id: cmd.inquiry_id,
                    buyer_id: self.buyer_id,
                    supplier_id: self.supplier_id,
                    actor: cmd.actor,
                    reapproval: self.approval == InquiryApprovalStatus::Rejected,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }

    fn handle_reject(&self, cmd: &RejectInquiry) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_conversation_open()?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("rejection reason cannot be empty"));
        }
        if self.approval == InquiryApprovalStatus::Rejected {
            return Err(DomainError::conflict("inquiry is already rejected"));
        }

        Ok(vec![InquiryEvent::Rejected(InquiryRejected {
            inquiry_id: cmd.inquiry_id,
            buyer_id: self.buyer_id,
            supplier_id: self.supplier_id,
            actor: cmd.actor,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_supplier_reply(&self, cmd: &ReplyAsSupplier) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_replyable()?;

        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("reply cannot be empty"));
        }

        Ok(vec![InquiryEvent::SupplierReplied(SupplierReplied {
            inquiry_id: cmd.inquiry_id,
            buyer_id: self.buyer_id,
            supplier_id: self.supplier_id,
            message: cmd.message.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_buyer_reply(&self, cmd: &ReplyAsBuyer) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_replyable()?;

        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("reply cannot be empty"));
        }

        Ok(vec![InquiryEvent::BuyerReplied(BuyerReplied {
            inquiry_id: cmd.inquiry_id,
            buyer_id: self.buyer_id,
            supplier_id: self.supplier_id,
            message: cmd.message.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteInquiry) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_conversation_open()?;

        Ok(vec![InquiryEvent::Deleted(InquiryDeleted {
            inquiry_id: cmd.inquiry_id,
            supplier_id: self.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_recover(&self, cmd: &RecoverInquiry) -> Result<Vec<InquiryEvent>, DomainError> {
        self.ensure_live()?;

        if self.conversation != ConversationStatus::Deleted {
            return Err(DomainError::illegal_transition(format!(
                "only deleted inquiries can be recovered (currently {})",
                self.conversation.as_str()
            )));
        }

        let restored_to = if self.supplier_reply.is_some() {
            ConversationStatus::Replied
        } else {
            ConversationStatus::Pending
        };

        Ok(vec![InquiryEvent::Recovered(InquiryRecovered {
            inquiry_id: cmd.inquiry_id,
            supplier_id: self.supplier_id,
            restored_to,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_core::UserId;
    use tradepost_events::execute;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn submitted_inquiry() -> Inquiry {
        let id = InquiryId::new(AggregateId::new());
        let mut inquiry = Inquiry::empty(id);
        execute(
            &mut inquiry,
            &InquiryCommand::Submit(SubmitInquiry {
                inquiry_id: id,
                buyer_id: BuyerId::from(UserId::new()),
                supplier_id: SupplierId::from(UserId::new()),
                product_id: None,
                subject: "Bulk pricing".to_string(),
                message: "What is your MOQ for 6204 bearings?".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        inquiry
    }

    fn approved_inquiry() -> Inquiry {
        let mut inquiry = submitted_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::Approve(ApproveInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        inquiry
    }

    #[test]
    fn new_inquiry_is_doubly_pending() {
        let inquiry = submitted_inquiry();
        assert_eq!(inquiry.conversation(), ConversationStatus::Pending);
        assert_eq!(inquiry.approval(), InquiryApprovalStatus::Pending);
    }

    #[test]
    fn submit_rejects_empty_message() {
        let id = InquiryId::new(AggregateId::new());
        let inquiry = Inquiry::empty(id);
        let err = inquiry
            .handle(&InquiryCommand::Submit(SubmitInquiry {
                inquiry_id: id,
                buyer_id: BuyerId::from(UserId::new()),
                supplier_id: SupplierId::from(UserId::new()),
                product_id: None,
                subject: String::new(),
                message: "   ".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replies_require_approval() {
        let inquiry = submitted_inquiry();
        let err = inquiry
            .handle(&InquiryCommand::ReplyAsSupplier(ReplyAsSupplier {
                inquiry_id: inquiry.id_typed(),
                message: "MOQ is 500 units.".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn first_reply_moves_conversation_to_replied() {
        let mut inquiry = approved_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::ReplyAsSupplier(ReplyAsSupplier {
                inquiry_id: inquiry.id_typed(),
                message: "MOQ is 500 units.".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert_eq!(inquiry.conversation(), ConversationStatus::Replied);
        assert!(inquiry.supplier_reply().is_some());
    }

    #[test]
    fn moderation_clears_buyer_reply() {
        let mut inquiry = approved_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::ReplyAsBuyer(ReplyAsBuyer {
                inquiry_id: inquiry.id_typed(),
                message: "Can you do 300?".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert!(inquiry.buyer_reply().is_some());

        execute(
            &mut inquiry,
            &InquiryCommand::Reject(RejectInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                reason: "contact details in message".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert!(inquiry.buyer_reply().is_none());
        assert_eq!(inquiry.approval(), InquiryApprovalStatus::Rejected);

        // Re-approval is allowed after rejection and also clears the reply.
        let events = execute(
            &mut inquiry,
            &InquiryCommand::Approve(ApproveInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        let InquiryEvent::Approved(e) = &events[0] else {
            panic!("expected Approved event");
        };
        assert!(e.reapproval);
        assert!(inquiry.buyer_reply().is_none());
        assert!(inquiry.rejection_reason().is_none());
    }

    #[test]
    fn reject_requires_reason() {
        let inquiry = submitted_inquiry();
        let err = inquiry
            .handle(&InquiryCommand::Reject(RejectInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                reason: "".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn double_approve_conflicts() {
        let inquiry = approved_inquiry();
        let err = inquiry
            .handle(&InquiryCommand::Approve(ApproveInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn recover_restores_replied_when_supplier_answered() {
        let mut inquiry = approved_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::ReplyAsSupplier(ReplyAsSupplier {
                inquiry_id: inquiry.id_typed(),
                message: "We ship worldwide.".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        execute(
            &mut inquiry,
            &InquiryCommand::Delete(DeleteInquiry {
                inquiry_id: inquiry.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(inquiry.conversation(), ConversationStatus::Deleted);

        execute(
            &mut inquiry,
            &InquiryCommand::Recover(RecoverInquiry {
                inquiry_id: inquiry.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(inquiry.conversation(), ConversationStatus::Replied);
    }

    #[test]
    fn recover_restores_pending_without_supplier_reply() {
        let mut inquiry = approved_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::Delete(DeleteInquiry {
                inquiry_id: inquiry.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        execute(
            &mut inquiry,
            &InquiryCommand::Recover(RecoverInquiry {
                inquiry_id: inquiry.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(inquiry.conversation(), ConversationStatus::Pending);
    }

    #[test]
    fn deleted_conversation_rejects_replies_and_moderation() {
        let mut inquiry = approved_inquiry();
        execute(
            &mut inquiry,
            &InquiryCommand::Delete(DeleteInquiry {
                inquiry_id: inquiry.id_typed(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        let err = inquiry
            .handle(&InquiryCommand::ReplyAsBuyer(ReplyAsBuyer {
                inquiry_id: inquiry.id_typed(),
                message: "Still there?".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        let err = inquiry
            .handle(&InquiryCommand::Reject(RejectInquiry {
                inquiry_id: inquiry.id_typed(),
                actor: UserId::new(),
                reason: "spam".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_command(id: InquiryId, tag: u8, text: String) -> InquiryCommand {
            match tag % 6 {
                0 => InquiryCommand::Approve(ApproveInquiry {
                    inquiry_id: id,
                    actor: UserId::new(),
                    occurred_at: Utc::now(),
                }),
                1 => InquiryCommand::Reject(RejectInquiry {
                    inquiry_id: id,
                    actor: UserId::new(),
                    reason: text,
                    occurred_at: Utc::now(),
                }),
                2 => InquiryCommand::ReplyAsSupplier(ReplyAsSupplier {
                    inquiry_id: id,
                    message: text,
                    occurred_at: Utc::now(),
                }),
                3 => InquiryCommand::ReplyAsBuyer(ReplyAsBuyer {
                    inquiry_id: id,
                    message: text,
                    occurred_at: Utc::now(),
                }),
                4 => InquiryCommand::Delete(DeleteInquiry {
                    inquiry_id: id,
                    occurred_at: Utc::now(),
                }),
                _ => InquiryCommand::Recover(RecoverInquiry {
                    inquiry_id: id,
                    occurred_at: Utc::now(),
                }),
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// A buyer reply can only survive while the inquiry stays
            /// approved: any moderation flip clears it.
            #[test]
            fn buyer_reply_implies_approved(
                tags in proptest::collection::vec(0u8..6, 0..20),
                text in "[a-z ]{1,30}"
            ) {
                let id = InquiryId::new(AggregateId::new());
                let mut inquiry = Inquiry::empty(id);
                execute(&mut inquiry, &InquiryCommand::Submit(SubmitInquiry {
                    inquiry_id: id,
                    buyer_id: BuyerId::from(UserId::new()),
                    supplier_id: SupplierId::from(UserId::new()),
                    product_id: None,
                    subject: "prop".to_string(),
                    message: "prop message".to_string(),
                    occurred_at: Utc::now(),
                })).unwrap();

                for tag in tags {
                    let _ = execute(&mut inquiry, &arbitrary_command(id, tag, text.clone()));

                    if inquiry.buyer_reply().is_some() {
                        prop_assert_eq!(inquiry.approval(), InquiryApprovalStatus::Approved);
                    }
                }
            }

            #[test]
            fn handle_does_not_mutate_state(tag in 0u8..6, text in "[a-z ]{1,30}") {
                let id = InquiryId::new(AggregateId::new());
                let mut inquiry = Inquiry::empty(id);
                execute(&mut inquiry, &InquiryCommand::Submit(SubmitInquiry {
                    inquiry_id: id,
                    buyer_id: BuyerId::from(UserId::new()),
                    supplier_id: SupplierId::from(UserId::new()),
                    product_id: None,
                    subject: "prop".to_string(),
                    message: "prop message".to_string(),
                    occurred_at: Utc::now(),
                })).unwrap();

                let before = inquiry.clone();
                let _ = inquiry.handle(&arbitrary_command(id, tag, text));
                prop_assert_eq!(before, inquiry);
            }
        }
    }
}
