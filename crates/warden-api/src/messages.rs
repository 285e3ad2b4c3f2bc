//! Handlers for `/messages` and `/conversations` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use warden_core::{message::Message, store::OversightStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub sender_child_id:    Uuid,
  pub recipient_child_id: Uuid,
  pub body:               String,
}

/// `POST /messages` — queues a `pending` message. Fails 404 when the two
/// children have no conversation, i.e. are not approved friends.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OversightStore,
{
  let message = store
    .send_message(body.sender_child_id, body.recipient_child_id, body.body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /messages/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError>
where
  S: OversightStore,
{
  let message = store
    .get_message(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Core(warden_core::Error::NotFound))?;
  Ok(Json(message))
}

/// `GET /conversations/:id/messages` — oldest first.
pub async fn list_for_conversation<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: OversightStore,
{
  let messages = store
    .list_messages(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(messages))
}
