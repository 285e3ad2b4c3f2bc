//! Append-only records: approvals and the audit trail.
//!
//! Both tables are written in the same transaction as the state change
//! they describe and are never updated or deleted. Approvals exist for
//! replay reconstruction independent of the subject's current status; the
//! audit log is the compliance-review surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of subject a decision targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
  Friendship,
  Message,
}

/// The recorded outcome of one guardian action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  Approved,
  Denied,
}

/// One immutable record per guardian action on a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
  pub approval_id: Uuid,
  pub subject_id:  Uuid,
  pub guardian_id: Uuid,
  pub decision:    Decision,
  pub recorded_at: DateTime<Utc>,
}

/// One immutable entry per state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub entry_id:    Uuid,
  /// The guardian who acted.
  pub guardian_id: Uuid,
  /// The child on whose behalf the satisfied stage was exercised.
  pub child_id:    Uuid,
  pub action:      String,
  pub details:     serde_json::Value,
  pub created_at:  DateTime<Utc>,
}
