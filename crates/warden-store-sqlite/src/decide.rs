//! The transactional decision path.
//!
//! One guardian action is one `IMMEDIATE` transaction: read the subject
//! row with the write lock already held, classify the caller's standing,
//! read the recipient child's current oversight mode, evaluate the policy,
//! run the pure state machine, apply the status and stamp writes, append
//! the approval record, materialise the conversation on friendship
//! approval, append the audit entry, commit. Validation failures surface
//! through the inner `Result` and commit nothing.
//!
//! Domain failures and database failures travel separately: the outer
//! `rusqlite::Result` is for storage trouble, the inner
//! `Result<_, warden_core::Error>` for the user-facing taxonomy.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior};
use uuid::Uuid;
use warden_core::{
  Error as CoreError,
  friendship::{Friendship, FriendshipStatus},
  machine::{self, Action, Actor, Snapshot, Stage},
  message::{Message, MessageStatus},
  policy::{self, PolicyInputs},
  record::Decision,
  standing::Standing,
};

use crate::{
  audit::{self, AuditWrite},
  encode::{
    decode_dt, decode_friendship_status, decode_message_status, decode_mode,
    encode_decision, encode_dt, encode_friendship_status,
    encode_message_status, encode_uuid,
  },
  ledger::{self, MaterializeInput},
};

type CoreResult<T> = Result<T, CoreError>;

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Map a decode failure onto `Internal`: a column we cannot read back is a
/// storage defect, not a caller mistake.
fn internal(e: impl std::fmt::Display) -> CoreError {
  CoreError::Internal(e.to_string())
}

fn parse_uuid(s: &str) -> CoreResult<Uuid> {
  Uuid::parse_str(s).map_err(internal)
}

fn parse_opt_uuid(s: Option<&str>) -> CoreResult<Option<Uuid>> {
  s.map(parse_uuid).transpose()
}

/// Resolve the caller's standing; a caller with no standing is told
/// `NotFound`, indistinguishable from a missing subject.
fn classify(
  caller_guardian_id: Uuid,
  sender_guardian: &str,
  recipient_guardian: &str,
) -> CoreResult<Actor> {
  let standing = Standing::classify(
    caller_guardian_id,
    parse_uuid(sender_guardian)?,
    parse_uuid(recipient_guardian)?,
  );
  if !standing.has_any() {
    return Err(CoreError::NotFound);
  }
  Ok(Actor { guardian_id: caller_guardian_id, standing })
}

fn snapshot(
  stage: Stage,
  sender_approver: Option<&str>,
  recipient_approver: Option<&str>,
) -> CoreResult<Snapshot> {
  Ok(Snapshot {
    stage,
    sender_approver: parse_opt_uuid(sender_approver)?,
    recipient_approver: parse_opt_uuid(recipient_approver)?,
  })
}

fn append_approval(
  tx: &Transaction<'_>,
  subject_id: &str,
  guardian_id: Uuid,
  action: Action,
  now: &str,
) -> rusqlite::Result<()> {
  let decision = match action {
    Action::Approve => Decision::Approved,
    Action::Deny => Decision::Denied,
  };
  tx.execute(
    "INSERT INTO approvals (approval_id, subject_id, guardian_id, decision, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      subject_id,
      encode_uuid(guardian_id),
      encode_decision(decision),
      now,
    ],
  )?;
  Ok(())
}

// ─── Friendship decisions ────────────────────────────────────────────────────

struct FriendshipRow {
  child_id:                        String,
  friend_child_id:                 String,
  status:                          String,
  approved_by_parent_id:           Option<String>,
  approved_by_recipient_parent_id: Option<String>,
  created_at:                      String,
  sender_guardian:                 String,
  recipient_guardian:              String,
}

pub(crate) fn run_friendship(
  conn: &mut Connection,
  friendship_id: Uuid,
  caller_guardian_id: Uuid,
  action: Action,
) -> rusqlite::Result<CoreResult<Friendship>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let id_str = encode_uuid(friendship_id);

  let row: Option<FriendshipRow> = tx
    .query_row(
      "SELECT f.child_id, f.friend_child_id, f.status,
              f.approved_by_parent_id, f.approved_by_recipient_parent_id,
              f.created_at,
              cs.guardian_id, cr.guardian_id
       FROM friendships f
       JOIN children cs ON cs.child_id = f.child_id
       JOIN children cr ON cr.child_id = f.friend_child_id
       WHERE f.friendship_id = ?1",
      rusqlite::params![id_str],
      |r| {
        Ok(FriendshipRow {
          child_id:                        r.get(0)?,
          friend_child_id:                 r.get(1)?,
          status:                          r.get(2)?,
          approved_by_parent_id:           r.get(3)?,
          approved_by_recipient_parent_id: r.get(4)?,
          created_at:                      r.get(5)?,
          sender_guardian:                 r.get(6)?,
          recipient_guardian:              r.get(7)?,
        })
      },
    )
    .optional()?;

  let Some(row) = row else {
    return Ok(Err(CoreError::NotFound));
  };

  let inner = apply_friendship(&tx, &id_str, friendship_id, caller_guardian_id, action, &row)?;
  if inner.is_ok() {
    tx.commit()?;
  }
  Ok(inner)
}

fn apply_friendship(
  tx: &Transaction<'_>,
  id_str: &str,
  friendship_id: Uuid,
  caller_guardian_id: Uuid,
  action: Action,
  row: &FriendshipRow,
) -> rusqlite::Result<CoreResult<Friendship>> {
  let prepared: CoreResult<(Actor, Snapshot, FriendshipStatus)> = (|| {
    let actor =
      classify(caller_guardian_id, &row.sender_guardian, &row.recipient_guardian)?;
    let status = decode_friendship_status(&row.status).map_err(internal)?;
    let snap = snapshot(
      status.stage(),
      row.approved_by_parent_id.as_deref(),
      row.approved_by_recipient_parent_id.as_deref(),
    )?;
    Ok((actor, snap, status))
  })();
  let (actor, snap, status) = match prepared {
    Ok(v) => v,
    Err(e) => return Ok(Err(e)),
  };

  // A new connection always needs both guardians on the two-guardian path;
  // the oversight policy applies to messages only.
  let effects = match machine::step(&snap, &actor, action, true) {
    Ok(e) => e,
    Err(e) => return Ok(Err(e)),
  };

  let now = Utc::now();
  let now_str = encode_dt(now);
  let new_status = FriendshipStatus::from_stage(effects.next);

  tx.execute(
    "UPDATE friendships SET
       status                          = ?2,
       approved_by_parent_id           = COALESCE(approved_by_parent_id, ?3),
       approved_by_recipient_parent_id = COALESCE(approved_by_recipient_parent_id, ?4),
       approved_at                     = COALESCE(approved_at, ?5)
     WHERE friendship_id = ?1",
    rusqlite::params![
      id_str,
      encode_friendship_status(new_status),
      effects.sender_approver.map(encode_uuid),
      effects.recipient_approver.map(encode_uuid),
      effects.finalized.then(|| now_str.clone()),
    ],
  )?;

  append_approval(tx, id_str, caller_guardian_id, action, &now_str)?;

  let final_sender = effects.sender_approver.or(snap.sender_approver);
  let final_recipient = effects.recipient_approver.or(snap.recipient_approver);

  if effects.next == Stage::Granted {
    ledger::materialize(tx, &MaterializeInput {
      child_id:           &row.child_id,
      friend_child_id:    &row.friend_child_id,
      sender_approver:    final_sender.map(encode_uuid),
      recipient_approver: final_recipient.map(encode_uuid),
      approved_at:        &now_str,
      now:                &now_str,
    })?;
  }

  let audited_child = match snap.stage {
    Stage::Pending => &row.child_id,
    _ => &row.friend_child_id,
  };
  audit::record(tx, AuditWrite {
    guardian_id: &encode_uuid(caller_guardian_id),
    child_id:    audited_child,
    action:      match action {
      Action::Approve => "friendship_approve",
      Action::Deny => "friendship_deny",
    },
    details:     serde_json::json!({
      "friendship_id": id_str,
      "from": encode_friendship_status(status),
      "to": encode_friendship_status(new_status),
      "final": new_status.is_terminal(),
      "collapsed": actor.standing.is_collapse() && snap.stage == Stage::Pending,
    }),
    recorded_at: &now_str,
  })?;

  Ok(build_friendship(friendship_id, row, new_status, final_sender, final_recipient, effects.finalized.then_some(now)))
}

fn build_friendship(
  friendship_id: Uuid,
  row: &FriendshipRow,
  status: FriendshipStatus,
  approved_by_parent_id: Option<Uuid>,
  approved_by_recipient_parent_id: Option<Uuid>,
  approved_at: Option<chrono::DateTime<Utc>>,
) -> CoreResult<Friendship> {
  Ok(Friendship {
    friendship_id,
    child_id: parse_uuid(&row.child_id)?,
    friend_child_id: parse_uuid(&row.friend_child_id)?,
    status,
    approved_by_parent_id,
    approved_by_recipient_parent_id,
    approved_at,
    created_at: decode_dt(&row.created_at).map_err(internal)?,
  })
}

// ─── Message decisions ───────────────────────────────────────────────────────

struct MessageRow {
  conversation_id:                 String,
  sender_child_id:                 String,
  body:                            String,
  status:                          String,
  approved_by_sender_parent_id:    Option<String>,
  approved_by_recipient_parent_id: Option<String>,
  created_at:                      String,
  child_a_id:                      String,
  child_b_id:                      String,
}

pub(crate) fn run_message(
  conn: &mut Connection,
  message_id: Uuid,
  caller_guardian_id: Uuid,
  action: Action,
) -> rusqlite::Result<CoreResult<Message>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let id_str = encode_uuid(message_id);

  let row: Option<MessageRow> = tx
    .query_row(
      "SELECT m.conversation_id, m.sender_child_id, m.body, m.status,
              m.approved_by_sender_parent_id, m.approved_by_recipient_parent_id,
              m.created_at,
              c.child_a_id, c.child_b_id
       FROM messages m
       JOIN conversations c ON c.conversation_id = m.conversation_id
       WHERE m.message_id = ?1",
      rusqlite::params![id_str],
      |r| {
        Ok(MessageRow {
          conversation_id:                 r.get(0)?,
          sender_child_id:                 r.get(1)?,
          body:                            r.get(2)?,
          status:                          r.get(3)?,
          approved_by_sender_parent_id:    r.get(4)?,
          approved_by_recipient_parent_id: r.get(5)?,
          created_at:                      r.get(6)?,
          child_a_id:                      r.get(7)?,
          child_b_id:                      r.get(8)?,
        })
      },
    )
    .optional()?;

  let Some(row) = row else {
    return Ok(Err(CoreError::NotFound));
  };

  let inner = apply_message(&tx, &id_str, message_id, caller_guardian_id, action, &row)?;
  if inner.is_ok() {
    tx.commit()?;
  }
  Ok(inner)
}

/// `(guardian_id, oversight_mode)` for one child, read in-transaction.
fn child_guardian_and_mode(
  tx: &Transaction<'_>,
  child_id: &str,
) -> rusqlite::Result<Option<(String, String)>> {
  tx.query_row(
    "SELECT guardian_id, oversight_mode FROM children WHERE child_id = ?1",
    rusqlite::params![child_id],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )
  .optional()
}

fn apply_message(
  tx: &Transaction<'_>,
  id_str: &str,
  message_id: Uuid,
  caller_guardian_id: Uuid,
  action: Action,
  row: &MessageRow,
) -> rusqlite::Result<CoreResult<Message>> {
  let recipient_child_id = if row.sender_child_id == row.child_a_id {
    &row.child_b_id
  } else {
    &row.child_a_id
  };

  let Some((sender_guardian, _)) = child_guardian_and_mode(tx, &row.sender_child_id)?
  else {
    return Ok(Err(CoreError::NotFound));
  };
  // The recipient's mode is read here, fresh, every time. Caching it across
  // the pending window would let a sender-side approval bypass a policy the
  // recipient's guardian changed mid-flight.
  let Some((recipient_guardian, recipient_mode_str)) =
    child_guardian_and_mode(tx, recipient_child_id)?
  else {
    return Ok(Err(CoreError::NotFound));
  };

  let prepared: CoreResult<(Actor, Snapshot, MessageStatus)> = (|| {
    let actor = classify(caller_guardian_id, &sender_guardian, &recipient_guardian)?;
    let status = decode_message_status(&row.status).map_err(internal)?;
    let snap = snapshot(
      status.stage(),
      row.approved_by_sender_parent_id.as_deref(),
      row.approved_by_recipient_parent_id.as_deref(),
    )?;
    Ok((actor, snap, status))
  })();
  let (actor, snap, status) = match prepared {
    Ok(v) => v,
    Err(e) => return Ok(Err(e)),
  };

  // Only a non-collapse sender-side approval consults the policy; every
  // other path ignores the flag.
  let needs_recipient_stage = if snap.stage == Stage::Pending
    && action == Action::Approve
    && !actor.standing.is_collapse()
  {
    let recipient_mode = match decode_mode(&recipient_mode_str) {
      Ok(m) => m,
      Err(e) => return Ok(Err(internal(e))),
    };
    // Per-direction history: a conversation is symmetric, but "first
    // message from this sender" is not.
    let prior: bool = tx.query_row(
      "SELECT EXISTS(
         SELECT 1 FROM messages
         WHERE conversation_id = ?1
           AND sender_child_id = ?2
           AND status = 'delivered'
           AND message_id != ?3)",
      rusqlite::params![row.conversation_id, row.sender_child_id, id_str],
      |r| r.get(0),
    )?;
    policy::recipient_needs_approval(&PolicyInputs {
      recipient_mode,
      sender_has_prior_delivery: prior,
    })
  } else {
    false
  };

  let effects = match machine::step(&snap, &actor, action, needs_recipient_stage) {
    Ok(e) => e,
    Err(e) => return Ok(Err(e)),
  };

  let now = Utc::now();
  let now_str = encode_dt(now);
  let new_status = MessageStatus::from_stage(effects.next);

  tx.execute(
    "UPDATE messages SET
       status                          = ?2,
       approved_by_sender_parent_id    = COALESCE(approved_by_sender_parent_id, ?3),
       approved_by_recipient_parent_id = COALESCE(approved_by_recipient_parent_id, ?4),
       delivered_at                    = COALESCE(delivered_at, ?5)
     WHERE message_id = ?1",
    rusqlite::params![
      id_str,
      encode_message_status(new_status),
      effects.sender_approver.map(encode_uuid),
      effects.recipient_approver.map(encode_uuid),
      effects.finalized.then(|| now_str.clone()),
    ],
  )?;

  append_approval(tx, id_str, caller_guardian_id, action, &now_str)?;

  let audited_child = match snap.stage {
    Stage::Pending => &row.sender_child_id,
    _ => recipient_child_id,
  };
  audit::record(tx, AuditWrite {
    guardian_id: &encode_uuid(caller_guardian_id),
    child_id:    audited_child,
    action:      match action {
      Action::Approve => "message_approve",
      Action::Deny => "message_deny",
    },
    details:     serde_json::json!({
      "message_id": id_str,
      "conversation_id": row.conversation_id,
      "from": encode_message_status(status),
      "to": encode_message_status(new_status),
      "final": new_status.is_terminal(),
      "collapsed": actor.standing.is_collapse() && snap.stage == Stage::Pending,
    }),
    recorded_at: &now_str,
  })?;

  let final_sender = effects.sender_approver.or(snap.sender_approver);
  let final_recipient = effects.recipient_approver.or(snap.recipient_approver);

  let built: CoreResult<Message> = (|| {
    Ok(Message {
      message_id,
      conversation_id: parse_uuid(&row.conversation_id)?,
      sender_child_id: parse_uuid(&row.sender_child_id)?,
      body: row.body.clone(),
      status: new_status,
      approved_by_sender_parent_id: final_sender,
      approved_by_recipient_parent_id: final_recipient,
      delivered_at: effects.finalized.then_some(now),
      created_at: decode_dt(&row.created_at).map_err(internal)?,
    })
  })();
  Ok(built)
}
