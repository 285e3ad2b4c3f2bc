//! The generic two-stage approval protocol.
//!
//! Friendship requests and message deliveries run the same machine; only
//! the names of the terminal states differ (`approved`/`blocked` versus
//! `delivered`/`denied`). The machine is a pure function over a snapshot
//! of the subject row; callers read the snapshot under a row lock, invoke
//! [`step`], and apply the returned [`Effects`] in the same transaction.

use uuid::Uuid;

use crate::{Error, Result, standing::Standing};

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Protocol stage, abstracted over the two subject kinds.
///
/// `Granted` maps to `approved` (friendship) or `delivered` (message);
/// `Refused` maps to `blocked` or `denied`. Transitions only ever move
/// forward along `Pending → PendingRecipient → Granted` (with a permitted
/// skip of the middle stage) or to `Refused` from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Pending,
  PendingRecipient,
  Granted,
  Refused,
}

impl Stage {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Granted | Self::Refused)
  }
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// A guardian's decision verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Approve,
  Deny,
}

impl Action {
  /// Parse the wire form. Anything but `approve`/`deny` is rejected before
  /// any storage read happens.
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "approve" => Ok(Self::Approve),
      "deny" => Ok(Self::Deny),
      other => Err(Error::InvalidAction(format!(
        "{other:?} is not \"approve\" or \"deny\""
      ))),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Approve => "approve",
      Self::Deny => "deny",
    }
  }
}

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// The acting guardian together with their classified standing.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
  pub guardian_id: Uuid,
  pub standing:    Standing,
}

/// The subject row as read, under the row lock, at the start of the
/// decision transaction.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
  pub stage:              Stage,
  pub sender_approver:    Option<Uuid>,
  pub recipient_approver: Option<Uuid>,
}

/// The writes a successful step commits. Approver stamps are set-if-absent:
/// `Some(id)` is only produced when the snapshot field was empty, so an
/// earlier real approval is never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effects {
  pub next:               Stage,
  pub sender_approver:    Option<Uuid>,
  pub recipient_approver: Option<Uuid>,
  /// When true the caller stamps `approved_at`/`delivered_at` with the
  /// transaction's clock reading.
  pub finalized:          bool,
}

impl Effects {
  fn refuse() -> Self {
    Self {
      next:               Stage::Refused,
      sender_approver:    None,
      recipient_approver: None,
      finalized:          false,
    }
  }
}

// ─── Transition function ─────────────────────────────────────────────────────

/// Advance the protocol by one guardian action.
///
/// `needs_recipient_stage` is the oversight policy verdict, computed fresh
/// inside the same transaction (see [`crate::policy`]); it is only
/// consulted on a non-collapse sender-side approval. Friendships always
/// pass `true`: a new connection needs both guardians on the two-guardian
/// path.
///
/// The same-guardian collapse rule: an actor holding both sender-side and
/// recipient-side standing exhausts both roles with a single approve from
/// `Pending`. Both approver fields are stamped in one transition and the
/// subject jumps straight to `Granted`. The protocol is defined over
/// guardians, not children, so this is the one identity-aware branch.
pub fn step(
  snapshot: &Snapshot,
  actor: &Actor,
  action: Action,
  needs_recipient_stage: bool,
) -> Result<Effects> {
  let stamp = |existing: Option<Uuid>| {
    existing.is_none().then_some(actor.guardian_id)
  };

  match snapshot.stage {
    Stage::Granted | Stage::Refused => Err(Error::AlreadyProcessed),

    Stage::Pending => {
      if !actor.standing.sender_side {
        return Err(Error::NotReady);
      }
      match action {
        Action::Deny => Ok(Effects::refuse()),
        Action::Approve if actor.standing.recipient_side => Ok(Effects {
          next:               Stage::Granted,
          sender_approver:    stamp(snapshot.sender_approver),
          recipient_approver: stamp(snapshot.recipient_approver),
          finalized:          true,
        }),
        Action::Approve if needs_recipient_stage => Ok(Effects {
          next:               Stage::PendingRecipient,
          sender_approver:    stamp(snapshot.sender_approver),
          recipient_approver: None,
          finalized:          false,
        }),
        Action::Approve => Ok(Effects {
          next:               Stage::Granted,
          sender_approver:    stamp(snapshot.sender_approver),
          recipient_approver: None,
          finalized:          true,
        }),
      }
    }

    Stage::PendingRecipient => {
      if !actor.standing.recipient_side {
        return Err(Error::NotReady);
      }
      match action {
        Action::Deny => Ok(Effects::refuse()),
        Action::Approve => Ok(Effects {
          next:               Stage::Granted,
          sender_approver:    None,
          recipient_approver: stamp(snapshot.recipient_approver),
          finalized:          true,
        }),
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
