//! Integration tests for `SqliteStore` against an in-memory database.

use uuid::Uuid;
use warden_core::{
  Error as CoreError,
  child::{Child, OversightMode},
  friendship::{Friendship, FriendshipStatus},
  machine::Action,
  message::MessageStatus,
  record::Decision,
  store::OversightStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A fresh guardian with one child under the given mode.
async fn family(s: &SqliteStore, mode: OversightMode) -> (Uuid, Child) {
  let guardian = Uuid::new_v4();
  let child = s.add_child(guardian, mode).await.unwrap();
  (guardian, child)
}

/// Run the full two-guardian friendship flow to `approved`.
async fn befriend(
  s: &SqliteStore,
  child: Uuid,
  friend: Uuid,
  sender_guardian: Uuid,
  recipient_guardian: Uuid,
) -> Friendship {
  let f = s.request_friendship(child, friend).await.unwrap();
  let f = s
    .decide_friendship(f.friendship_id, sender_guardian, Action::Approve)
    .await
    .unwrap();
  assert_eq!(f.status, FriendshipStatus::PendingRecipient);
  s.decide_friendship(f.friendship_id, recipient_guardian, Action::Approve)
    .await
    .unwrap()
}

fn assert_core(err: &Error, expected: &CoreError) {
  match err {
    Error::Core(core) => assert_eq!(core, expected),
    other => panic!("expected core error {expected:?}, got {other:?}"),
  }
}

// ─── Children ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_child() {
  let s = store().await;

  let (guardian, child) = family(&s, OversightMode::ApproveAll).await;
  let fetched = s.get_child(child.child_id).await.unwrap().unwrap();
  assert_eq!(fetched.child_id, child.child_id);
  assert_eq!(fetched.guardian_id, guardian);
  assert_eq!(fetched.oversight_mode, OversightMode::ApproveAll);
}

#[tokio::test]
async fn get_child_missing_returns_none() {
  let s = store().await;
  assert!(s.get_child(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn owning_guardian_can_change_oversight_mode() {
  let s = store().await;
  let (guardian, child) = family(&s, OversightMode::Monitor).await;

  let updated = s
    .set_oversight_mode(child.child_id, guardian, OversightMode::ApproveAll)
    .await
    .unwrap();
  assert_eq!(updated.oversight_mode, OversightMode::ApproveAll);

  // The change is audited against the child.
  let entries = s.audit_for_child(child.child_id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].action, "oversight_mode_change");
}

#[tokio::test]
async fn stranger_cannot_change_oversight_mode() {
  let s = store().await;
  let (_, child) = family(&s, OversightMode::Monitor).await;

  let err = s
    .set_oversight_mode(child.child_id, Uuid::new_v4(), OversightMode::Monitor)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotFound);
}

// ─── Friendship requests ─────────────────────────────────────────────────────

#[tokio::test]
async fn request_friendship_starts_pending() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;
  let (_, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  assert_eq!(f.status, FriendshipStatus::Pending);
  assert!(f.approved_by_parent_id.is_none());
  assert!(f.approved_by_recipient_parent_id.is_none());
  assert!(f.approved_at.is_none());
}

#[tokio::test]
async fn self_friendship_is_rejected() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;

  let err = s
    .request_friendship(c1.child_id, c1.child_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SelfFriendship));
}

#[tokio::test]
async fn duplicate_friendship_is_rejected_in_both_directions() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;
  let (_, c2) = family(&s, OversightMode::Monitor).await;

  s.request_friendship(c1.child_id, c2.child_id).await.unwrap();

  let err = s
    .request_friendship(c1.child_id, c2.child_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateFriendship(..)));

  let err = s
    .request_friendship(c2.child_id, c1.child_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateFriendship(..)));
}

#[tokio::test]
async fn request_friendship_with_unknown_child_is_not_found() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;

  let err = s
    .request_friendship(c1.child_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotFound);
}

// ─── Friendship decisions ────────────────────────────────────────────────────

#[tokio::test]
async fn two_guardian_friendship_approval_flow() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();

  // Stage one: the sender-side guardian.
  let f = s
    .decide_friendship(f.friendship_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(f.status, FriendshipStatus::PendingRecipient);
  assert_eq!(f.approved_by_parent_id, Some(g1));
  assert!(f.approved_by_recipient_parent_id.is_none());
  assert!(f.approved_at.is_none());

  // Stage two: the recipient-side guardian.
  let f = s
    .decide_friendship(f.friendship_id, g2, Action::Approve)
    .await
    .unwrap();
  assert_eq!(f.status, FriendshipStatus::Approved);
  assert_eq!(f.approved_by_parent_id, Some(g1));
  assert_eq!(f.approved_by_recipient_parent_id, Some(g2));
  assert!(f.approved_at.is_some());

  // The conversation was materialised, canonically keyed.
  let conv = s
    .get_conversation(c2.child_id, c1.child_id)
    .await
    .unwrap()
    .expect("conversation");
  assert!(conv.child_a_id < conv.child_b_id);

  // The reciprocal row exists, approved, with the approvers swapped.
  let rows = s.list_friendships(c2.child_id).await.unwrap();
  let reciprocal = rows
    .iter()
    .find(|r| r.child_id == c2.child_id && r.friend_child_id == c1.child_id)
    .expect("reciprocal row");
  assert_eq!(reciprocal.status, FriendshipStatus::Approved);
  assert_eq!(reciprocal.approved_by_parent_id, Some(g2));
  assert_eq!(reciprocal.approved_by_recipient_parent_id, Some(g1));
}

#[tokio::test]
async fn friendship_denial_is_terminal_and_creates_no_conversation() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  s.decide_friendship(f.friendship_id, g1, Action::Approve)
    .await
    .unwrap();

  let f = s
    .decide_friendship(f.friendship_id, g2, Action::Deny)
    .await
    .unwrap();
  assert_eq!(f.status, FriendshipStatus::Blocked);

  let audit_before = s.audit_for_child(c2.child_id).await.unwrap().len();

  // A late approve from the sender side bounces off the terminal state...
  let err = s
    .decide_friendship(f.friendship_id, g1, Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::AlreadyProcessed);

  // ...and leaves no trace: no conversation, no new audit entry.
  assert!(
    s.get_conversation(c1.child_id, c2.child_id)
      .await
      .unwrap()
      .is_none()
  );
  assert_eq!(
    s.audit_for_child(c2.child_id).await.unwrap().len(),
    audit_before
  );
}

#[tokio::test]
async fn recipient_guardian_cannot_act_before_the_sender_stage() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  let err = s
    .decide_friendship(f.friendship_id, g2, Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotReady);
}

#[tokio::test]
async fn sender_guardian_cannot_act_at_the_recipient_stage() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (_, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  s.decide_friendship(f.friendship_id, g1, Action::Approve)
    .await
    .unwrap();

  let err = s
    .decide_friendship(f.friendship_id, g1, Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotReady);
}

#[tokio::test]
async fn stranger_guardian_sees_not_found() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;
  let (_, c2) = family(&s, OversightMode::Monitor).await;

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  let err = s
    .decide_friendship(f.friendship_id, Uuid::new_v4(), Action::Approve)
    .await
    .unwrap_err();
  // Indistinguishable from a friendship that does not exist.
  assert_core(&err, &CoreError::NotFound);

  let err = s
    .decide_friendship(Uuid::new_v4(), Uuid::new_v4(), Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotFound);
}

#[tokio::test]
async fn same_guardian_collapse_completes_friendship_in_one_approve() {
  let s = store().await;
  let guardian = Uuid::new_v4();
  let c1 = s.add_child(guardian, OversightMode::Monitor).await.unwrap();
  let c2 = s
    .add_child(guardian, OversightMode::ApproveAll)
    .await
    .unwrap();

  let f = s.request_friendship(c1.child_id, c2.child_id).await.unwrap();
  let f = s
    .decide_friendship(f.friendship_id, guardian, Action::Approve)
    .await
    .unwrap();

  // Same terminal state and stamps as the two-guardian path would produce.
  assert_eq!(f.status, FriendshipStatus::Approved);
  assert_eq!(f.approved_by_parent_id, Some(guardian));
  assert_eq!(f.approved_by_recipient_parent_id, Some(guardian));
  assert!(f.approved_at.is_some());

  // Materialised exactly once.
  assert!(
    s.get_conversation(c1.child_id, c2.child_id)
      .await
      .unwrap()
      .is_some()
  );
  let rows = s.list_friendships(c1.child_id).await.unwrap();
  assert_eq!(rows.len(), 2);
}

// ─── Message sending ─────────────────────────────────────────────────────────

#[tokio::test]
async fn send_message_without_friendship_is_not_found() {
  let s = store().await;
  let (_, c1) = family(&s, OversightMode::Monitor).await;
  let (_, c2) = family(&s, OversightMode::Monitor).await;

  let err = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::NotFound);
}

#[tokio::test]
async fn send_message_starts_pending() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Pending);
  assert!(m.delivered_at.is_none());

  let listed = s.list_messages(m.conversation_id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].body, "hi");
}

// ─── Message decisions ───────────────────────────────────────────────────────

#[tokio::test]
async fn approve_first_needs_two_stages_then_one() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveFirst).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  // First message: no prior delivery from c1 to c2, so the policy demands
  // the recipient stage.
  let m1 = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  let m1 = s
    .decide_message(m1.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m1.status, MessageStatus::PendingRecipient);
  assert_eq!(m1.approved_by_sender_parent_id, Some(g1));
  assert!(m1.delivered_at.is_none());

  let m1 = s
    .decide_message(m1.message_id, g2, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m1.status, MessageStatus::Delivered);
  assert_eq!(m1.approved_by_recipient_parent_id, Some(g2));
  assert!(m1.delivered_at.is_some());

  // Second message from the same sender delivers on the sender stage alone.
  let m2 = s
    .send_message(c1.child_id, c2.child_id, "hi again".into())
    .await
    .unwrap();
  let m2 = s
    .decide_message(m2.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m2.status, MessageStatus::Delivered);
  assert!(m2.approved_by_recipient_parent_id.is_none());
  assert!(m2.delivered_at.is_some());
}

#[tokio::test]
async fn approve_first_is_per_direction() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::ApproveFirst).await;
  let (g2, c2) = family(&s, OversightMode::ApproveFirst).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  // Deliver a first message c1 → c2 through both stages.
  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  s.decide_message(m.message_id, g1, Action::Approve).await.unwrap();
  s.decide_message(m.message_id, g2, Action::Approve).await.unwrap();

  // The conversation now has a delivered message, but none from c2, so
  // c2's first reply still needs c1's guardian.
  let reply = s
    .send_message(c2.child_id, c1.child_id, "hello".into())
    .await
    .unwrap();
  let reply = s
    .decide_message(reply.message_id, g2, Action::Approve)
    .await
    .unwrap();
  assert_eq!(reply.status, MessageStatus::PendingRecipient);
}

#[tokio::test]
async fn approve_all_requires_the_recipient_stage_every_time() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  for body in ["one", "two"] {
    let m = s
      .send_message(c1.child_id, c2.child_id, body.into())
      .await
      .unwrap();
    let m = s
      .decide_message(m.message_id, g1, Action::Approve)
      .await
      .unwrap();
    assert_eq!(m.status, MessageStatus::PendingRecipient);
    s.decide_message(m.message_id, g2, Action::Approve).await.unwrap();
  }
}

#[tokio::test]
async fn monitor_delivers_on_the_sender_stage_alone() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  let m = s
    .decide_message(m.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Delivered);
  assert_eq!(m.approved_by_sender_parent_id, Some(g1));
  assert!(m.approved_by_recipient_parent_id.is_none());
}

#[tokio::test]
async fn oversight_mode_change_mid_flight_is_honoured() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  // Queued while the recipient demanded approval for everything.
  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();

  // The recipient's guardian relaxes the policy before the sender stage.
  s.set_oversight_mode(c2.child_id, g2, OversightMode::Monitor)
    .await
    .unwrap();

  // The evaluator runs at sender-approval time, so the message delivers
  // without a recipient stage.
  let m = s
    .decide_message(m.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Delivered);

  // And the other way: tightening is honoured too.
  let m2 = s
    .send_message(c1.child_id, c2.child_id, "another".into())
    .await
    .unwrap();
  s.set_oversight_mode(c2.child_id, g2, OversightMode::ApproveAll)
    .await
    .unwrap();
  let m2 = s
    .decide_message(m2.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m2.status, MessageStatus::PendingRecipient);
}

#[tokio::test]
async fn message_denial_is_terminal() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::ApproveAll).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  let m = s
    .decide_message(m.message_id, g1, Action::Deny)
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Denied);

  let err = s
    .decide_message(m.message_id, g2, Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::AlreadyProcessed);
}

#[tokio::test]
async fn same_guardian_collapse_delivers_in_one_approve() {
  let s = store().await;
  let guardian = Uuid::new_v4();
  let c1 = s.add_child(guardian, OversightMode::Monitor).await.unwrap();
  let c2 = s
    .add_child(guardian, OversightMode::ApproveAll)
    .await
    .unwrap();
  befriend(&s, c1.child_id, c2.child_id, guardian, guardian).await;

  // approve_all would normally force a second stage; the collapse rule
  // satisfies both stages with this one action.
  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  let m = s
    .decide_message(m.message_id, guardian, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Delivered);
  assert_eq!(m.approved_by_sender_parent_id, Some(guardian));
  assert_eq!(m.approved_by_recipient_parent_id, Some(guardian));
}

// ─── Approvals and audit ─────────────────────────────────────────────────────

#[tokio::test]
async fn every_guardian_action_appends_one_approval() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  s.decide_message(m.message_id, g1, Action::Approve).await.unwrap();
  s.decide_message(m.message_id, g2, Action::Approve).await.unwrap();

  let approvals = s.approvals_for(m.message_id).await.unwrap();
  assert_eq!(approvals.len(), 2);
  assert_eq!(approvals[0].guardian_id, g1);
  assert_eq!(approvals[1].guardian_id, g2);
  assert!(approvals.iter().all(|a| a.decision == Decision::Approved));
}

#[tokio::test]
async fn terminal_retry_mutates_nothing() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::Monitor).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  let m = s
    .decide_message(m.message_id, g1, Action::Approve)
    .await
    .unwrap();
  assert_eq!(m.status, MessageStatus::Delivered);

  let approvals_before = s.approvals_for(m.message_id).await.unwrap().len();
  let audit_before = s.audit_for_child(c1.child_id).await.unwrap().len();

  let err = s
    .decide_message(m.message_id, g1, Action::Approve)
    .await
    .unwrap_err();
  assert_core(&err, &CoreError::AlreadyProcessed);

  // No storage mutation and no new append rows.
  let unchanged = s.get_message(m.message_id).await.unwrap().unwrap();
  assert_eq!(unchanged.status, MessageStatus::Delivered);
  assert_eq!(unchanged.delivered_at, m.delivered_at);
  assert_eq!(
    s.approvals_for(m.message_id).await.unwrap().len(),
    approvals_before
  );
  assert_eq!(
    s.audit_for_child(c1.child_id).await.unwrap().len(),
    audit_before
  );
}

#[tokio::test]
async fn audit_details_flag_terminal_transitions() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  s.decide_message(m.message_id, g1, Action::Approve).await.unwrap();
  s.decide_message(m.message_id, g2, Action::Approve).await.unwrap();

  // The intermediate stage is marked non-final, the delivery final.
  let sender_side = s.audit_for_child(c1.child_id).await.unwrap();
  let stage_one = sender_side
    .iter()
    .find(|e| e.action == "message_approve")
    .expect("sender-stage entry");
  assert_eq!(stage_one.details["final"], serde_json::json!(false));

  let recipient_side = s.audit_for_child(c2.child_id).await.unwrap();
  let stage_two = recipient_side
    .iter()
    .find(|e| e.action == "message_approve")
    .expect("recipient-stage entry");
  assert_eq!(stage_two.details["final"], serde_json::json!(true));
}

#[tokio::test]
async fn audit_entries_name_the_child_of_the_satisfied_stage() {
  let s = store().await;
  let (g1, c1) = family(&s, OversightMode::Monitor).await;
  let (g2, c2) = family(&s, OversightMode::ApproveAll).await;
  befriend(&s, c1.child_id, c2.child_id, g1, g2).await;

  let m = s
    .send_message(c1.child_id, c2.child_id, "hi".into())
    .await
    .unwrap();
  s.decide_message(m.message_id, g1, Action::Approve).await.unwrap();
  s.decide_message(m.message_id, g2, Action::Approve).await.unwrap();

  let sender_side = s.audit_for_child(c1.child_id).await.unwrap();
  assert!(
    sender_side
      .iter()
      .any(|e| e.action == "message_approve" && e.guardian_id == g1)
  );

  let recipient_side = s.audit_for_child(c2.child_id).await.unwrap();
  assert!(
    recipient_side
      .iter()
      .any(|e| e.action == "message_approve" && e.guardian_id == g2)
  );
}
