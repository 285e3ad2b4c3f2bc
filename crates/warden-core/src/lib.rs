//! Core types and trait definitions for the Warden oversight engine.
//!
//! Warden gates every child-to-child friendship and message behind
//! independent guardian consent. This crate holds the domain model, the
//! error taxonomy, and the pure protocol pieces (standing classification,
//! oversight policy, the approval state machine). It is deliberately free
//! of HTTP and database dependencies; all other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod child;
pub mod conversation;
pub mod error;
pub mod friendship;
pub mod machine;
pub mod message;
pub mod policy;
pub mod record;
pub mod standing;
pub mod store;

pub use error::{Error, Result};
