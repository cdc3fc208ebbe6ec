//! Aggregate stream type identifiers.
//!
//! One constant per aggregate kind; the event store keeps the type stable
//! across a stream and projections route envelopes by it.

pub const ACCOUNT: &str = "identity.account";
pub const SUPPLIER: &str = "suppliers.profile";
pub const BUYER: &str = "buyers.profile";
pub const PRODUCT: &str = "catalog.product";
pub const INQUIRY: &str = "inquiries.inquiry";
