//! Persistence layer for SentiFlow.
//!
//! Writes a post and its analysis result to Postgres in one transaction.
//! The pipeline acknowledges a log entry only after the transaction
//! commits, so the store is the durability boundary of the system: if it
//! fails, the entry stays pending and is redelivered.

pub mod error;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use postgres::PostgresResultStore;
pub use store::ResultStore;
