//! Child identities and their oversight configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-child policy controlling how much recipient-side consent a message
/// needs. The owning guardian may change it at any time; decisions always
/// read the current value, never a cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversightMode {
  /// Messages deliver on sender-side approval alone; the guardian reviews
  /// the conversation after the fact.
  Monitor,
  /// The first message from each new sender needs recipient-side approval;
  /// later messages from that sender deliver on sender-side approval.
  ApproveFirst,
  /// Every message needs recipient-side approval.
  ApproveAll,
}

/// A minor account. The child authors content; every consent decision is
/// exercised by the owning guardian.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
  pub child_id:       Uuid,
  pub guardian_id:    Uuid,
  pub oversight_mode: OversightMode,
  pub created_at:     DateTime<Utc>,
}
