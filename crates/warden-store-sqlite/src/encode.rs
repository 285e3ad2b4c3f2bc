//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings — every writer goes through
//! [`encode_uuid`], so string equality and string ordering agree with
//! [`Uuid`] equality and ordering, which the canonical-pair constraint on
//! `conversations` relies on.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_core::{
  child::{Child, OversightMode},
  conversation::Conversation,
  friendship::{Friendship, FriendshipStatus},
  message::{Message, MessageStatus},
  record::{Approval, AuditLogEntry, Decision},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── OversightMode ───────────────────────────────────────────────────────────

pub fn encode_mode(m: OversightMode) -> &'static str {
  match m {
    OversightMode::Monitor => "monitor",
    OversightMode::ApproveFirst => "approve_first",
    OversightMode::ApproveAll => "approve_all",
  }
}

pub fn decode_mode(s: &str) -> Result<OversightMode> {
  match s {
    "monitor" => Ok(OversightMode::Monitor),
    "approve_first" => Ok(OversightMode::ApproveFirst),
    "approve_all" => Ok(OversightMode::ApproveAll),
    other => Err(Error::Decode {
      column: "oversight_mode",
      value:  other.to_owned(),
    }),
  }
}

// ─── Statuses ────────────────────────────────────────────────────────────────

pub fn encode_friendship_status(s: FriendshipStatus) -> &'static str {
  match s {
    FriendshipStatus::Pending => "pending",
    FriendshipStatus::PendingRecipient => "pending_recipient",
    FriendshipStatus::Approved => "approved",
    FriendshipStatus::Blocked => "blocked",
  }
}

pub fn decode_friendship_status(s: &str) -> Result<FriendshipStatus> {
  match s {
    "pending" => Ok(FriendshipStatus::Pending),
    "pending_recipient" => Ok(FriendshipStatus::PendingRecipient),
    "approved" => Ok(FriendshipStatus::Approved),
    "blocked" => Ok(FriendshipStatus::Blocked),
    other => Err(Error::Decode {
      column: "friendships.status",
      value:  other.to_owned(),
    }),
  }
}

pub fn encode_message_status(s: MessageStatus) -> &'static str {
  match s {
    MessageStatus::Pending => "pending",
    MessageStatus::PendingRecipient => "pending_recipient",
    MessageStatus::Delivered => "delivered",
    MessageStatus::Denied => "denied",
  }
}

pub fn decode_message_status(s: &str) -> Result<MessageStatus> {
  match s {
    "pending" => Ok(MessageStatus::Pending),
    "pending_recipient" => Ok(MessageStatus::PendingRecipient),
    "delivered" => Ok(MessageStatus::Delivered),
    "denied" => Ok(MessageStatus::Denied),
    other => Err(Error::Decode {
      column: "messages.status",
      value:  other.to_owned(),
    }),
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

pub fn encode_decision(d: Decision) -> &'static str {
  match d {
    Decision::Approved => "approved",
    Decision::Denied => "denied",
  }
}

pub fn decode_decision(s: &str) -> Result<Decision> {
  match s {
    "approved" => Ok(Decision::Approved),
    "denied" => Ok(Decision::Denied),
    other => Err(Error::Decode {
      column: "approvals.decision",
      value:  other.to_owned(),
    }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `children` row.
pub struct RawChild {
  pub child_id:       String,
  pub guardian_id:    String,
  pub oversight_mode: String,
  pub created_at:     String,
}

impl RawChild {
  pub fn into_child(self) -> Result<Child> {
    Ok(Child {
      child_id:       decode_uuid(&self.child_id)?,
      guardian_id:    decode_uuid(&self.guardian_id)?,
      oversight_mode: decode_mode(&self.oversight_mode)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `friendships` row.
pub struct RawFriendship {
  pub friendship_id:                   String,
  pub child_id:                        String,
  pub friend_child_id:                 String,
  pub status:                          String,
  pub approved_by_parent_id:           Option<String>,
  pub approved_by_recipient_parent_id: Option<String>,
  pub approved_at:                     Option<String>,
  pub created_at:                      String,
}

impl RawFriendship {
  pub fn into_friendship(self) -> Result<Friendship> {
    Ok(Friendship {
      friendship_id:                   decode_uuid(&self.friendship_id)?,
      child_id:                        decode_uuid(&self.child_id)?,
      friend_child_id:                 decode_uuid(&self.friend_child_id)?,
      status:                          decode_friendship_status(&self.status)?,
      approved_by_parent_id:           decode_opt_uuid(
        self.approved_by_parent_id.as_deref(),
      )?,
      approved_by_recipient_parent_id: decode_opt_uuid(
        self.approved_by_recipient_parent_id.as_deref(),
      )?,
      approved_at:                     self
        .approved_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_at:                      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:                      String,
  pub conversation_id:                 String,
  pub sender_child_id:                 String,
  pub body:                            String,
  pub status:                          String,
  pub approved_by_sender_parent_id:    Option<String>,
  pub approved_by_recipient_parent_id: Option<String>,
  pub delivered_at:                    Option<String>,
  pub created_at:                      String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:                      decode_uuid(&self.message_id)?,
      conversation_id:                 decode_uuid(&self.conversation_id)?,
      sender_child_id:                 decode_uuid(&self.sender_child_id)?,
      body:                            self.body,
      status:                          decode_message_status(&self.status)?,
      approved_by_sender_parent_id:    decode_opt_uuid(
        self.approved_by_sender_parent_id.as_deref(),
      )?,
      approved_by_recipient_parent_id: decode_opt_uuid(
        self.approved_by_recipient_parent_id.as_deref(),
      )?,
      delivered_at:                    self
        .delivered_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_at:                      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `conversations` row.
pub struct RawConversation {
  pub conversation_id: String,
  pub child_a_id:      String,
  pub child_b_id:      String,
  pub created_at:      String,
}

impl RawConversation {
  pub fn into_conversation(self) -> Result<Conversation> {
    Ok(Conversation {
      conversation_id: decode_uuid(&self.conversation_id)?,
      child_a_id:      decode_uuid(&self.child_a_id)?,
      child_b_id:      decode_uuid(&self.child_b_id)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `approvals` row.
pub struct RawApproval {
  pub approval_id: String,
  pub subject_id:  String,
  pub guardian_id: String,
  pub decision:    String,
  pub recorded_at: String,
}

impl RawApproval {
  pub fn into_approval(self) -> Result<Approval> {
    Ok(Approval {
      approval_id: decode_uuid(&self.approval_id)?,
      subject_id:  decode_uuid(&self.subject_id)?,
      guardian_id: decode_uuid(&self.guardian_id)?,
      decision:    decode_decision(&self.decision)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `audit_log` row.
pub struct RawAuditEntry {
  pub entry_id:    String,
  pub guardian_id: String,
  pub child_id:    String,
  pub action:      String,
  pub details:     String,
  pub created_at:  String,
}

impl RawAuditEntry {
  pub fn into_entry(self) -> Result<AuditLogEntry> {
    Ok(AuditLogEntry {
      entry_id:    decode_uuid(&self.entry_id)?,
      guardian_id: decode_uuid(&self.guardian_id)?,
      child_id:    decode_uuid(&self.child_id)?,
      action:      self.action,
      details:     serde_json::from_str(&self.details)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
