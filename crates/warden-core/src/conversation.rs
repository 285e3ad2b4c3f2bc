//! Conversations — the shared channel between a pair of children.
//!
//! The pair is canonicalised (lower id first) so at most one conversation
//! ever exists per unordered pair. Created lazily, exactly once, on first
//! mutual friendship approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The canonical (lower id first) ordering of a child pair.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
  if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
  pub conversation_id: Uuid,
  /// The lower id of the pair.
  pub child_a_id:      Uuid,
  /// The higher id of the pair.
  pub child_b_id:      Uuid,
  pub created_at:      DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_pair_is_order_insensitive() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    let (lo, hi) = canonical_pair(a, b);
    assert!(lo <= hi);
  }

}
