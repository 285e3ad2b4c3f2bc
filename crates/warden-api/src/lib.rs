//! JSON REST API for Warden.
//!
//! Exposes an axum [`Router`] backed by any
//! [`warden_core::store::OversightStore`]. Authentication and guardian
//! identity resolution happen upstream; handlers receive a `guardian_id`
//! the surrounding platform has already verified. TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", warden_api::api_router(store.clone()))
//! ```

pub mod audit;
pub mod children;
pub mod decisions;
pub mod error;
pub mod friendships;
pub mod messages;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use warden_core::store::OversightStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: OversightStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Children
    .route("/children", post(children::create::<S>))
    .route("/children/{id}", get(children::get_one::<S>))
    .route("/children/{id}/oversight", put(children::set_oversight::<S>))
    .route("/children/{id}/friendships", get(friendships::list_for_child::<S>))
    // Friendships
    .route("/friendships", post(friendships::create::<S>))
    .route("/friendships/{id}", get(friendships::get_one::<S>))
    // Messages
    .route("/messages", post(messages::create::<S>))
    .route("/messages/{id}", get(messages::get_one::<S>))
    .route("/conversations/{id}/messages", get(messages::list_for_conversation::<S>))
    // Decisions — the single mutating operation of the approval engine
    .route("/decisions", post(decisions::decide::<S>))
    .route("/decisions/{subject_id}/approvals", get(decisions::approvals::<S>))
    // Audit
    .route("/audit", get(audit::for_child::<S>))
    .with_state(store)
}
