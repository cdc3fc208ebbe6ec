//! `tradepost-buyers` — buyer profile lifecycle.

pub mod profile;

pub use profile::{
    ActivateBuyer, BuyerCommand, BuyerDeleted, BuyerEvent, BuyerId, BuyerProfile, BuyerStatus,
    BuyerSuspended, CreateBuyer, DeleteBuyer, SuspendBuyer, UpdateBuyerDetails,
};
