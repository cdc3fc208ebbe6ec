//! `tradepost-identity` — user account lifecycle (registration, verification,
//! password reset, supersede-on-reregistration).

pub mod account;
pub mod password;

pub use account::{
    Account, AccountCommand, AccountEvent, AccountRegistered, DeleteAccount, EmailVerified,
    PasswordReset, PasswordResetRequested, RegisterAccount, RequestPasswordReset, ResetPassword,
    SupersedeAccount, TokenRecord, VerifyEmail,
};
pub use password::{PasswordError, hash_password, verify_password};
