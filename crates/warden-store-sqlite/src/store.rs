//! [`SqliteStore`] — the SQLite implementation of [`OversightStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use warden_core::{
  child::{Child, OversightMode},
  conversation::{Conversation, canonical_pair},
  friendship::{Friendship, FriendshipStatus},
  machine::Action,
  message::{Message, MessageStatus},
  record::{Approval, AuditLogEntry},
  store::OversightStore,
};

use crate::{
  Error, Result,
  audit::{self, AuditWrite},
  decide,
  encode::{
    RawApproval, RawAuditEntry, RawChild, RawConversation, RawFriendship,
    RawMessage, encode_dt, encode_friendship_status, encode_message_status,
    encode_mode, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Warden oversight store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_friendship_raw(&self, id: Uuid) -> Result<Option<RawFriendship>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT friendship_id, child_id, friend_child_id, status,
                      approved_by_parent_id, approved_by_recipient_parent_id,
                      approved_at, created_at
               FROM friendships WHERE friendship_id = ?1",
              rusqlite::params![id_str],
              friendship_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn friendship_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawFriendship> {
  Ok(RawFriendship {
    friendship_id:                   row.get(0)?,
    child_id:                        row.get(1)?,
    friend_child_id:                 row.get(2)?,
    status:                          row.get(3)?,
    approved_by_parent_id:           row.get(4)?,
    approved_by_recipient_parent_id: row.get(5)?,
    approved_at:                     row.get(6)?,
    created_at:                      row.get(7)?,
  })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
  Ok(RawMessage {
    message_id:                      row.get(0)?,
    conversation_id:                 row.get(1)?,
    sender_child_id:                 row.get(2)?,
    body:                            row.get(3)?,
    status:                          row.get(4)?,
    approved_by_sender_parent_id:    row.get(5)?,
    approved_by_recipient_parent_id: row.get(6)?,
    delivered_at:                    row.get(7)?,
    created_at:                      row.get(8)?,
  })
}

// ─── OversightStore impl ─────────────────────────────────────────────────────

impl OversightStore for SqliteStore {
  type Error = Error;

  // ── Children ──────────────────────────────────────────────────────────────

  async fn add_child(
    &self,
    guardian_id: Uuid,
    mode: OversightMode,
  ) -> Result<Child> {
    let child = Child {
      child_id: Uuid::new_v4(),
      guardian_id,
      oversight_mode: mode,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(child.child_id);
    let guardian_str = encode_uuid(guardian_id);
    let mode_str = encode_mode(mode).to_owned();
    let at_str = encode_dt(child.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO children (child_id, guardian_id, oversight_mode, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, guardian_str, mode_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(child)
  }

  async fn get_child(&self, child_id: Uuid) -> Result<Option<Child>> {
    let id_str = encode_uuid(child_id);

    let raw: Option<RawChild> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT child_id, guardian_id, oversight_mode, created_at
               FROM children WHERE child_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawChild {
                  child_id:       row.get(0)?,
                  guardian_id:    row.get(1)?,
                  oversight_mode: row.get(2)?,
                  created_at:     row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawChild::into_child).transpose()
  }

  async fn set_oversight_mode(
    &self,
    child_id: Uuid,
    caller_guardian_id: Uuid,
    mode: OversightMode,
  ) -> Result<Child> {
    let id_str = encode_uuid(child_id);
    let guardian_str = encode_uuid(caller_guardian_id);
    let mode_str = encode_mode(mode).to_owned();
    let now_str = encode_dt(Utc::now());

    // The ownership check and the write happen in one statement; a caller
    // who is not the owning guardian changes zero rows and learns nothing
    // beyond `NotFound`.
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE children SET oversight_mode = ?3
           WHERE child_id = ?1 AND guardian_id = ?2",
          rusqlite::params![id_str, guardian_str, mode_str],
        )?;
        if changed > 0 {
          audit::record(&tx, AuditWrite {
            guardian_id: &guardian_str,
            child_id:    &id_str,
            action:      "oversight_mode_change",
            details:     serde_json::json!({ "oversight_mode": mode_str }),
            recorded_at: &now_str,
          })?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(warden_core::Error::NotFound));
    }
    self
      .get_child(child_id)
      .await?
      .ok_or(Error::Core(warden_core::Error::NotFound))
  }

  // ── Friendships ───────────────────────────────────────────────────────────

  async fn request_friendship(
    &self,
    child_id: Uuid,
    friend_child_id: Uuid,
  ) -> Result<Friendship> {
    if child_id == friend_child_id {
      return Err(Error::SelfFriendship);
    }

    let friendship = Friendship {
      friendship_id: Uuid::new_v4(),
      child_id,
      friend_child_id,
      status: FriendshipStatus::Pending,
      approved_by_parent_id: None,
      approved_by_recipient_parent_id: None,
      approved_at: None,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(friendship.friendship_id);
    let child_str = encode_uuid(child_id);
    let friend_str = encode_uuid(friend_child_id);
    let status_str = encode_friendship_status(friendship.status).to_owned();
    let at_str = encode_dt(friendship.created_at);

    let outcome: RequestOutcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let both_exist: i64 = tx.query_row(
          "SELECT COUNT(*) FROM children WHERE child_id IN (?1, ?2)",
          rusqlite::params![child_str, friend_str],
          |r| r.get(0),
        )?;
        if both_exist != 2 {
          return Ok(RequestOutcome::ChildMissing);
        }

        // Either direction counts as a duplicate: the reverse row already
        // carries (or already decided) the same consent question.
        let duplicate: bool = tx.query_row(
          "SELECT EXISTS(
             SELECT 1 FROM friendships
             WHERE (child_id = ?1 AND friend_child_id = ?2)
                OR (child_id = ?2 AND friend_child_id = ?1))",
          rusqlite::params![child_str, friend_str],
          |r| r.get(0),
        )?;
        if duplicate {
          return Ok(RequestOutcome::Duplicate);
        }

        tx.execute(
          "INSERT INTO friendships (
             friendship_id, child_id, friend_child_id, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, child_str, friend_str, status_str, at_str],
        )?;
        tx.commit()?;
        Ok(RequestOutcome::Created)
      })
      .await?;

    match outcome {
      RequestOutcome::Created => Ok(friendship),
      RequestOutcome::ChildMissing => {
        Err(Error::Core(warden_core::Error::NotFound))
      }
      RequestOutcome::Duplicate => {
        Err(Error::DuplicateFriendship(child_id, friend_child_id))
      }
    }
  }

  async fn get_friendship(&self, friendship_id: Uuid) -> Result<Option<Friendship>> {
    let raw = self.get_friendship_raw(friendship_id).await?;
    raw.map(RawFriendship::into_friendship).transpose()
  }

  async fn list_friendships(&self, child_id: Uuid) -> Result<Vec<Friendship>> {
    let id_str = encode_uuid(child_id);

    let raws: Vec<RawFriendship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT friendship_id, child_id, friend_child_id, status,
                  approved_by_parent_id, approved_by_recipient_parent_id,
                  approved_at, created_at
           FROM friendships
           WHERE child_id = ?1 OR friend_child_id = ?1
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], friendship_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFriendship::into_friendship).collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn send_message(
    &self,
    sender_child_id: Uuid,
    recipient_child_id: Uuid,
    body: String,
  ) -> Result<Message> {
    // No conversation means the children are not approved friends; that is
    // `NotFound`, same as a conversation the caller has no standing on.
    let conversation = self
      .get_conversation(sender_child_id, recipient_child_id)
      .await?
      .ok_or(Error::Core(warden_core::Error::NotFound))?;

    let message = Message {
      message_id: Uuid::new_v4(),
      conversation_id: conversation.conversation_id,
      sender_child_id,
      body,
      status: MessageStatus::Pending,
      approved_by_sender_parent_id: None,
      approved_by_recipient_parent_id: None,
      delivered_at: None,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(message.message_id);
    let conv_str = encode_uuid(message.conversation_id);
    let sender_str = encode_uuid(sender_child_id);
    let body_clone = message.body.clone();
    let status_str = encode_message_status(message.status).to_owned();
    let at_str = encode_dt(message.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             message_id, conversation_id, sender_child_id, body, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, conv_str, sender_str, body_clone, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>> {
    let id_str = encode_uuid(message_id);

    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT message_id, conversation_id, sender_child_id, body, status,
                      approved_by_sender_parent_id, approved_by_recipient_parent_id,
                      delivered_at, created_at
               FROM messages WHERE message_id = ?1",
              rusqlite::params![id_str],
              message_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMessage::into_message).transpose()
  }

  async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
    let conv_str = encode_uuid(conversation_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, conversation_id, sender_child_id, body, status,
                  approved_by_sender_parent_id, approved_by_recipient_parent_id,
                  delivered_at, created_at
           FROM messages WHERE conversation_id = ?1
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![conv_str], message_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn get_conversation(
    &self,
    child_a: Uuid,
    child_b: Uuid,
  ) -> Result<Option<Conversation>> {
    let (lo, hi) = canonical_pair(child_a, child_b);
    let lo_str = encode_uuid(lo);
    let hi_str = encode_uuid(hi);

    let raw: Option<RawConversation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT conversation_id, child_a_id, child_b_id, created_at
               FROM conversations WHERE child_a_id = ?1 AND child_b_id = ?2",
              rusqlite::params![lo_str, hi_str],
              |row| {
                Ok(RawConversation {
                  conversation_id: row.get(0)?,
                  child_a_id:      row.get(1)?,
                  child_b_id:      row.get(2)?,
                  created_at:      row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConversation::into_conversation).transpose()
  }

  // ── Decisions ─────────────────────────────────────────────────────────────

  async fn decide_friendship(
    &self,
    friendship_id: Uuid,
    caller_guardian_id: Uuid,
    action: Action,
  ) -> Result<Friendship> {
    let inner = self
      .conn
      .call(move |conn| {
        Ok(decide::run_friendship(conn, friendship_id, caller_guardian_id, action)?)
      })
      .await?;

    let friendship = inner.map_err(Error::Core)?;
    tracing::info!(
      %friendship_id,
      status = ?friendship.status,
      action = action.as_str(),
      "friendship decision applied"
    );
    Ok(friendship)
  }

  async fn decide_message(
    &self,
    message_id: Uuid,
    caller_guardian_id: Uuid,
    action: Action,
  ) -> Result<Message> {
    let inner = self
      .conn
      .call(move |conn| {
        Ok(decide::run_message(conn, message_id, caller_guardian_id, action)?)
      })
      .await?;

    let message = inner.map_err(Error::Core)?;
    tracing::info!(
      %message_id,
      status = ?message.status,
      action = action.as_str(),
      "message decision applied"
    );
    Ok(message)
  }

  // ── Audit reads ───────────────────────────────────────────────────────────

  async fn approvals_for(&self, subject_id: Uuid) -> Result<Vec<Approval>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawApproval> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT approval_id, subject_id, guardian_id, decision, recorded_at
           FROM approvals WHERE subject_id = ?1
           ORDER BY recorded_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawApproval {
              approval_id: row.get(0)?,
              subject_id:  row.get(1)?,
              guardian_id: row.get(2)?,
              decision:    row.get(3)?,
              recorded_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApproval::into_approval).collect()
  }

  async fn audit_for_child(&self, child_id: Uuid) -> Result<Vec<AuditLogEntry>> {
    let id_str = encode_uuid(child_id);

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, guardian_id, child_id, action, details, created_at
           FROM audit_log WHERE child_id = ?1
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawAuditEntry {
              entry_id:    row.get(0)?,
              guardian_id: row.get(1)?,
              child_id:    row.get(2)?,
              action:      row.get(3)?,
              details:     row.get(4)?,
              created_at:  row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }
}

/// Outcome of the `request_friendship` transaction, resolved to an error
/// outside the connection closure.
enum RequestOutcome {
  Created,
  ChildMissing,
  Duplicate,
}
