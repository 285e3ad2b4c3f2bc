//! Handler for the compliance-review audit feed.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use uuid::Uuid;
use warden_core::{record::AuditLogEntry, store::OversightStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  pub child_id: Uuid,
}

/// `GET /audit?child_id=<id>` — every recorded transition touching the
/// child, oldest first.
pub async fn for_child<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError>
where
  S: OversightStore,
{
  let entries = store
    .audit_for_child(params.child_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}
