//! Swappable key/value stores for disposable read models.

pub mod record_store;

pub use record_store::{InMemoryRecordStore, RecordStore};
