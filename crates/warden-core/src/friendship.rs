//! Friendship requests — the directional consent record between children.
//!
//! The row is ordered: `child_id` initiated, `friend_child_id` is the
//! target. Direction drives sender/recipient guardian classification even
//! though an approved relationship is symmetric. The reciprocal row
//! (friend → child) exists if and only if the forward row is `approved`;
//! it is created by the conversation ledger, never by a guardian action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::machine::Stage;

/// Lifecycle of a friend request. `Blocked` is terminal; a denied request
/// is never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
  Pending,
  PendingRecipient,
  Approved,
  Blocked,
}

impl FriendshipStatus {
  pub fn stage(self) -> Stage {
    match self {
      Self::Pending => Stage::Pending,
      Self::PendingRecipient => Stage::PendingRecipient,
      Self::Approved => Stage::Granted,
      Self::Blocked => Stage::Refused,
    }
  }

  pub fn from_stage(stage: Stage) -> Self {
    match stage {
      Stage::Pending => Self::Pending,
      Stage::PendingRecipient => Self::PendingRecipient,
      Stage::Granted => Self::Approved,
      Stage::Refused => Self::Blocked,
    }
  }

  pub fn is_terminal(self) -> bool {
    self.stage().is_terminal()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
  pub friendship_id:                   Uuid,
  /// The initiating (sender-side) child.
  pub child_id:                        Uuid,
  /// The target (recipient-side) child.
  pub friend_child_id:                 Uuid,
  pub status:                          FriendshipStatus,
  pub approved_by_parent_id:           Option<Uuid>,
  pub approved_by_recipient_parent_id: Option<Uuid>,
  pub approved_at:                     Option<DateTime<Utc>>,
  pub created_at:                      DateTime<Utc>,
}
