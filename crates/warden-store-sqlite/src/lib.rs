//! SQLite backend for the Warden oversight store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Decision transactions open
//! with `IMMEDIATE` behaviour, which takes the write lock up front and
//! serialises racing guardian actions on the same subject.

mod audit;
mod decide;
mod encode;
mod ledger;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
