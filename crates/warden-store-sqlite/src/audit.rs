//! The audit trail — append-only, written inside the decision transaction.
//!
//! A rolled-back transition therefore never leaves an orphaned audit
//! entry, and a committed transition is never left unaudited.

use rusqlite::Transaction;
use uuid::Uuid;

use crate::encode::encode_uuid;

pub(crate) struct AuditWrite<'a> {
  pub guardian_id: &'a str,
  /// The child on whose behalf the satisfied stage was exercised.
  pub child_id:    &'a str,
  pub action:      &'a str,
  pub details:     serde_json::Value,
  pub recorded_at: &'a str,
}

pub(crate) fn record(
  tx: &Transaction<'_>,
  write: AuditWrite<'_>,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO audit_log (entry_id, guardian_id, child_id, action, details, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      write.guardian_id,
      write.child_id,
      write.action,
      write.details.to_string(),
      write.recorded_at,
    ],
  )?;
  Ok(())
}
