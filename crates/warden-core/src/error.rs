//! Error taxonomy for `warden-core`.
//!
//! These are the user-facing error kinds every decision surface maps to.
//! Storage backends wrap their own failures and fold them into
//! [`Error::Internal`] at the boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The subject does not exist, or the caller has no standing on it.
  /// The two cases are deliberately indistinguishable so a guardian cannot
  /// probe for the existence of other families' requests.
  #[error("not found")]
  NotFound,

  /// The request is malformed: an action other than `approve`/`deny`, a
  /// child befriending itself, or a duplicate friend request.
  #[error("invalid action: {0}")]
  InvalidAction(String),

  /// The subject is already in a terminal state. A stale retry lands here
  /// explicitly; it is never silently absorbed.
  #[error("already processed")]
  AlreadyProcessed,

  /// The caller's role does not match the subject's current stage.
  #[error("subject is not ready for this guardian's decision")]
  NotReady,

  /// Storage or transaction failure. The detail is for logs only; the
  /// display form never exposes it to the caller.
  #[error("internal error")]
  Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
