//! Error type for `warden-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] warden_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column holds a value no current code path writes.
  #[error("unknown {column} value: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("a child cannot befriend itself")]
  SelfFriendship,

  #[error("a friend request already exists between {0} and {1}")]
  DuplicateFriendship(Uuid, Uuid),
}

/// Fold a backend error into the user-facing taxonomy. Request-shape
/// problems become `InvalidAction`; everything that is not already a core
/// kind becomes `Internal`, keeping storage detail out of responses.
impl From<Error> for warden_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::SelfFriendship | Error::DuplicateFriendship(..) => {
        warden_core::Error::InvalidAction(e.to_string())
      }
      other => warden_core::Error::Internal(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
