//! Messages — content gated behind the same two-stage protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::machine::Stage;

/// Delivery lifecycle. Status only moves forward through
/// `pending → pending_recipient → delivered` (or skips the middle stage),
/// or to `denied` from any non-terminal state; never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
  Pending,
  PendingRecipient,
  Delivered,
  Denied,
}

impl MessageStatus {
  pub fn stage(self) -> Stage {
    match self {
      Self::Pending => Stage::Pending,
      Self::PendingRecipient => Stage::PendingRecipient,
      Self::Delivered => Stage::Granted,
      Self::Denied => Stage::Refused,
    }
  }

  pub fn from_stage(stage: Stage) -> Self {
    match stage {
      Stage::Pending => Self::Pending,
      Stage::PendingRecipient => Self::PendingRecipient,
      Stage::Granted => Self::Delivered,
      Stage::Refused => Self::Denied,
    }
  }

  pub fn is_terminal(self) -> bool {
    self.stage().is_terminal()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub message_id:                   Uuid,
  pub conversation_id:              Uuid,
  pub sender_child_id:              Uuid,
  pub body:                         String,
  pub status:                       MessageStatus,
  pub approved_by_sender_parent_id: Option<Uuid>,
  pub approved_by_recipient_parent_id: Option<Uuid>,
  pub delivered_at:                 Option<DateTime<Utc>>,
  pub created_at:                   DateTime<Utc>,
}
