//! The conversation ledger — side effects of a fully approved friendship.
//!
//! On reaching `approved` the forward friendship row gains two artefacts:
//! the canonical conversation for the pair and the reciprocal `approved`
//! friendship row. Both inserts are `INSERT OR IGNORE` keyed on the
//! schema's unique constraints, so a retried final approval cannot create
//! duplicates. Runs inside the same transaction as the state transition.

use rusqlite::Transaction;
use uuid::Uuid;

use crate::encode::encode_uuid;

pub(crate) struct MaterializeInput<'a> {
  /// The initiating child of the forward row.
  pub child_id:           &'a str,
  /// The target child of the forward row.
  pub friend_child_id:    &'a str,
  /// Final approver stamps of the forward row. They land swapped on the
  /// reciprocal row, whose "sender side" is the original recipient.
  pub sender_approver:    Option<String>,
  pub recipient_approver: Option<String>,
  pub approved_at:        &'a str,
  pub now:                &'a str,
}

pub(crate) fn materialize(
  tx: &Transaction<'_>,
  input: &MaterializeInput<'_>,
) -> rusqlite::Result<()> {
  // Uuids are stored hyphenated-lowercase everywhere, so string order
  // agrees with Uuid order and the canonical pair is stable.
  let (a, b) = if input.child_id <= input.friend_child_id {
    (input.child_id, input.friend_child_id)
  } else {
    (input.friend_child_id, input.child_id)
  };

  tx.execute(
    "INSERT OR IGNORE INTO conversations (conversation_id, child_a_id, child_b_id, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![encode_uuid(Uuid::new_v4()), a, b, input.now],
  )?;

  tx.execute(
    "INSERT OR IGNORE INTO friendships (
       friendship_id, child_id, friend_child_id, status,
       approved_by_parent_id, approved_by_recipient_parent_id,
       approved_at, created_at
     ) VALUES (?1, ?2, ?3, 'approved', ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      input.friend_child_id,
      input.child_id,
      input.recipient_approver,
      input.sender_approver,
      input.approved_at,
      input.now,
    ],
  )?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::SCHEMA;

  fn conn_with_children(a: &str, b: &str) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("in-memory db");
    conn.execute_batch(SCHEMA).expect("schema");
    for id in [a, b] {
      conn
        .execute(
          "INSERT INTO children (child_id, guardian_id, oversight_mode, created_at)
           VALUES (?1, ?2, 'monitor', '2024-01-01T00:00:00+00:00')",
          rusqlite::params![id, encode_uuid(Uuid::new_v4())],
        )
        .expect("child row");
    }
    conn
  }

  #[test]
  fn materialize_twice_creates_one_conversation_and_one_reciprocal_row() {
    let a = encode_uuid(Uuid::new_v4());
    let b = encode_uuid(Uuid::new_v4());
    let mut conn = conn_with_children(&a, &b);

    let guardian = encode_uuid(Uuid::new_v4());
    let input = MaterializeInput {
      child_id:           &a,
      friend_child_id:    &b,
      sender_approver:    Some(guardian.clone()),
      recipient_approver: Some(guardian),
      approved_at:        "2024-01-02T00:00:00+00:00",
      now:                "2024-01-02T00:00:00+00:00",
    };

    for _ in 0..2 {
      let tx = conn.transaction().unwrap();
      materialize(&tx, &input).unwrap();
      tx.commit().unwrap();
    }

    let conversations: i64 = conn
      .query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))
      .unwrap();
    assert_eq!(conversations, 1);

    let reciprocal: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM friendships WHERE child_id = ?1 AND friend_child_id = ?2",
        rusqlite::params![b, a],
        |r| r.get(0),
      )
      .unwrap();
    assert_eq!(reciprocal, 1);
  }

  #[test]
  fn materialize_canonicalizes_the_pair_order() {
    let a = encode_uuid(Uuid::new_v4());
    let b = encode_uuid(Uuid::new_v4());
    let mut conn = conn_with_children(&a, &b);

    // Deliberately pass the higher id as the initiator.
    let (lo, hi) = if a <= b { (&a, &b) } else { (&b, &a) };
    let input = MaterializeInput {
      child_id:           hi,
      friend_child_id:    lo,
      sender_approver:    None,
      recipient_approver: None,
      approved_at:        "2024-01-02T00:00:00+00:00",
      now:                "2024-01-02T00:00:00+00:00",
    };

    let tx = conn.transaction().unwrap();
    materialize(&tx, &input).unwrap();
    tx.commit().unwrap();

    let (stored_a, stored_b): (String, String) = conn
      .query_row(
        "SELECT child_a_id, child_b_id FROM conversations",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
      )
      .unwrap();
    assert_eq!(&stored_a, lo);
    assert_eq!(&stored_b, hi);
  }
}
