//! `tradepost-suppliers` — supplier profile lifecycle and moderation.

pub mod profile;

pub use profile::{
    ActivateProfile, ApproveProfile, CompanyDetails, ContactInfo, CreateProfile, DeleteProfile,
    OnboardingDraftSaved, OnboardingSubmitted, ProfileActivated, ProfileApproved, ProfileCreated,
    ProfileDeleted, ProfileRejected, ProfileRestored, ProfileSuspended, RejectProfile,
    RestoreProfile, SaveOnboardingDraft, SubmitOnboarding, SupplierEvent, SupplierId,
    SupplierProfile, SupplierCommand, SupplierStatus, SuspendProfile,
};
