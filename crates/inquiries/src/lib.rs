//! `tradepost-inquiries` — buyer-to-supplier inquiries with the dual
//! conversation/approval status machine.

pub mod inquiry;

pub use inquiry::{
    ApproveInquiry, BuyerReplied, ConversationStatus, DeleteInquiry, Inquiry, InquiryApproved,
    InquiryApprovalStatus, InquiryCommand, InquiryDeleted, InquiryEvent, InquiryId,
    InquiryRecovered, InquiryRejected, InquirySubmitted, RecoverInquiry, RejectInquiry, Reply,
    ReplyAsBuyer, ReplyAsSupplier, SubmitInquiry, SupplierReplied,
};
