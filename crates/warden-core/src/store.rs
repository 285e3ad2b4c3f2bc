//! The `OversightStore` trait.
//!
//! Implemented by storage backends (e.g. `warden-store-sqlite`). Higher
//! layers (`warden-api`, `warden-server`) depend on this abstraction, not
//! on any concrete backend.
//!
//! Every `decide_*` call must execute as one atomic transaction holding a
//! row-level lock (or equivalent) on the subject for the whole
//! read-validate-write: a racing second decision observes the committed
//! terminal status and fails `AlreadyProcessed` with no writes. All other
//! methods are single reads or single-row writes.

use std::future::Future;

use uuid::Uuid;

use crate::{
  child::{Child, OversightMode},
  conversation::Conversation,
  friendship::Friendship,
  machine::Action,
  message::Message,
  record::{Approval, AuditLogEntry},
};

/// Abstraction over a Warden storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Backend errors
/// fold into the core taxonomy via the `Into<Error>` bound; anything that
/// is not one of the five kinds becomes `Internal`.
pub trait OversightStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Children ──────────────────────────────────────────────────────────

  /// Register a child under `guardian_id` with an initial oversight mode.
  fn add_child(
    &self,
    guardian_id: Uuid,
    mode: OversightMode,
  ) -> impl Future<Output = Result<Child, Self::Error>> + Send + '_;

  /// Retrieve a child by id. Returns `None` if not found.
  fn get_child(
    &self,
    child_id: Uuid,
  ) -> impl Future<Output = Result<Option<Child>, Self::Error>> + Send + '_;

  /// Change a child's oversight mode. Only the owning guardian may do
  /// this; anyone else gets `NotFound` (merged with the missing-child
  /// case). Takes effect for every decision after the commit.
  fn set_oversight_mode(
    &self,
    child_id: Uuid,
    caller_guardian_id: Uuid,
    mode: OversightMode,
  ) -> impl Future<Output = Result<Child, Self::Error>> + Send + '_;

  // ── Friendships ───────────────────────────────────────────────────────

  /// Open a friend request from `child_id` to `friend_child_id` with
  /// status `pending`. Self-friending and duplicate pairs are rejected.
  fn request_friendship(
    &self,
    child_id: Uuid,
    friend_child_id: Uuid,
  ) -> impl Future<Output = Result<Friendship, Self::Error>> + Send + '_;

  fn get_friendship(
    &self,
    friendship_id: Uuid,
  ) -> impl Future<Output = Result<Option<Friendship>, Self::Error>> + Send + '_;

  /// All friendship rows in which `child_id` appears on either side.
  fn list_friendships(
    &self,
    child_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Friendship>, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Queue a message from `sender_child_id` to `recipient_child_id` with
  /// status `pending`. Fails `NotFound` when no conversation exists for
  /// the pair, i.e. the children are not (yet) approved friends.
  fn send_message(
    &self,
    sender_child_id: Uuid,
    recipient_child_id: Uuid,
    body: String,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  fn get_message(
    &self,
    message_id: Uuid,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Messages in a conversation, oldest first.
  fn list_messages(
    &self,
    conversation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// The canonical conversation for an unordered child pair, if any.
  fn get_conversation(
    &self,
    child_a: Uuid,
    child_b: Uuid,
  ) -> impl Future<Output = Result<Option<Conversation>, Self::Error>> + Send + '_;

  // ── Decisions ─────────────────────────────────────────────────────────

  /// Apply one guardian action to a friend request and return the updated
  /// row. On reaching `approved`, the conversation and the reciprocal
  /// friendship row are materialised in the same transaction.
  fn decide_friendship(
    &self,
    friendship_id: Uuid,
    caller_guardian_id: Uuid,
    action: Action,
  ) -> impl Future<Output = Result<Friendship, Self::Error>> + Send + '_;

  /// Apply one guardian action to a message and return the updated row.
  /// The oversight policy is evaluated fresh inside the transaction on a
  /// sender-side approval.
  fn decide_message(
    &self,
    message_id: Uuid,
    caller_guardian_id: Uuid,
    action: Action,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  // ── Audit reads ───────────────────────────────────────────────────────

  /// All approval records ever appended for a subject, oldest first.
  fn approvals_for(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Approval>, Self::Error>> + Send + '_;

  /// The audit trail for a child, oldest first.
  fn audit_for_child(
    &self,
    child_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditLogEntry>, Self::Error>> + Send + '_;
}
