//! Oversight policy — does this message need the recipient stage?
//!
//! The evaluator is a pure function; the two inputs are gathered fresh
//! inside the decision transaction, never cached across the pending
//! window. A guardian loosening or tightening the recipient's mode while
//! a message waits for sender-side approval is therefore always honoured.

use crate::child::OversightMode;

/// Inputs to [`recipient_needs_approval`].
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
  /// The recipient child's mode as of this transaction.
  pub recipient_mode: OversightMode,
  /// True when any prior message from this sender in this conversation has
  /// reached `delivered`. Conversations are symmetric but "first message
  /// from X" is per-direction, so the history query is keyed on the
  /// (conversation, sender) pair.
  pub sender_has_prior_delivery: bool,
}

pub fn recipient_needs_approval(inputs: &PolicyInputs) -> bool {
  match inputs.recipient_mode {
    OversightMode::Monitor => false,
    OversightMode::ApproveAll => true,
    OversightMode::ApproveFirst => !inputs.sender_has_prior_delivery,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn eval(mode: OversightMode, prior: bool) -> bool {
    recipient_needs_approval(&PolicyInputs {
      recipient_mode:            mode,
      sender_has_prior_delivery: prior,
    })
  }

  #[test]
  fn monitor_never_requires_the_second_stage() {
    assert!(!eval(OversightMode::Monitor, false));
    assert!(!eval(OversightMode::Monitor, true));
  }

  #[test]
  fn approve_all_always_requires_the_second_stage() {
    assert!(eval(OversightMode::ApproveAll, false));
    assert!(eval(OversightMode::ApproveAll, true));
  }

  #[test]
  fn approve_first_requires_it_only_for_the_first_delivery() {
    assert!(eval(OversightMode::ApproveFirst, false));
    assert!(!eval(OversightMode::ApproveFirst, true));
  }
}
