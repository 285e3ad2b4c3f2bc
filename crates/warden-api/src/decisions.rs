//! `POST /decisions` — the approval engine's single mutating operation.
//!
//! `action` arrives as a string and is parsed before anything touches the
//! store, so an unknown verb is rejected with `invalid_action` and no
//! storage read. Everything else (standing, stage validation, policy,
//! terminal-state enforcement) happens inside the store's decision
//! transaction.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{
  machine::Action,
  record::{Approval, SubjectType},
  store::OversightStore,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DecideBody {
  pub subject_type: SubjectType,
  pub subject_id:   Uuid,
  /// Resolved by the surrounding platform's auth layer.
  pub guardian_id:  Uuid,
  /// `"approve"` or `"deny"`.
  pub action:       String,
}

#[derive(Debug, Serialize)]
pub struct DecideResponse {
  pub subject_type: SubjectType,
  pub subject_id:   Uuid,
  pub new_status:   String,
}

/// `POST /decisions`
pub async fn decide<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<DecideBody>,
) -> Result<Json<DecideResponse>, ApiError>
where
  S: OversightStore,
{
  let action = Action::parse(&body.action)?;

  let new_status = match body.subject_type {
    SubjectType::Friendship => {
      let friendship = store
        .decide_friendship(body.subject_id, body.guardian_id, action)
        .await
        .map_err(ApiError::from_store)?;
      status_string(&friendship.status)?
    }
    SubjectType::Message => {
      let message = store
        .decide_message(body.subject_id, body.guardian_id, action)
        .await
        .map_err(ApiError::from_store)?;
      status_string(&message.status)?
    }
  };

  Ok(Json(DecideResponse {
    subject_type: body.subject_type,
    subject_id:   body.subject_id,
    new_status,
  }))
}

/// `GET /decisions/:subject_id/approvals` — the append-only decision
/// history for a subject, oldest first.
pub async fn approvals<S>(
  State(store): State<Arc<S>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<Approval>>, ApiError>
where
  S: OversightStore,
{
  let approvals = store
    .approvals_for(subject_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(approvals))
}

/// Render a status enum to its snake_case wire form.
fn status_string<T: Serialize>(status: &T) -> Result<String, ApiError> {
  match serde_json::to_value(status) {
    Ok(serde_json::Value::String(s)) => Ok(s),
    Ok(other) => Err(ApiError::Core(warden_core::Error::Internal(format!(
      "status serialised to non-string: {other}"
    )))),
    Err(e) => Err(ApiError::Core(warden_core::Error::Internal(e.to_string()))),
  }
}
