//! Guardian standing — which side(s) of a subject the caller controls.
//!
//! Standing is computed by resolving the guardian-of-record for the sender
//! child and the recipient child and comparing each against the caller.
//! Both flags true is the same-guardian collapse case; neither true means
//! the caller has no business with the subject at all.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
  pub sender_side:    bool,
  pub recipient_side: bool,
}

impl Standing {
  pub fn classify(
    caller_guardian_id: Uuid,
    sender_guardian_id: Uuid,
    recipient_guardian_id: Uuid,
  ) -> Self {
    Self {
      sender_side:    caller_guardian_id == sender_guardian_id,
      recipient_side: caller_guardian_id == recipient_guardian_id,
    }
  }

  /// False means the caller must see `NotFound`, indistinguishable from a
  /// subject that does not exist.
  pub fn has_any(&self) -> bool {
    self.sender_side || self.recipient_side
  }

  /// The same guardian owns both children.
  pub fn is_collapse(&self) -> bool {
    self.sender_side && self.recipient_side
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classify_covers_all_four_outcomes() {
    let g1 = Uuid::new_v4();
    let g2 = Uuid::new_v4();
    let g3 = Uuid::new_v4();

    let sender = Standing::classify(g1, g1, g2);
    assert!(sender.sender_side && !sender.recipient_side);
    assert!(sender.has_any() && !sender.is_collapse());

    let recipient = Standing::classify(g2, g1, g2);
    assert!(!recipient.sender_side && recipient.recipient_side);

    let collapse = Standing::classify(g1, g1, g1);
    assert!(collapse.is_collapse());

    let stranger = Standing::classify(g3, g1, g2);
    assert!(!stranger.has_any());
  }
}
