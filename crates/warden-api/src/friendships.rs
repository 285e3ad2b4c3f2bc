//! Handlers for `/friendships` endpoints.
//!
//! Creation opens a `pending` request; all state changes go through
//! `POST /decisions` (see [`crate::decisions`]).

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use warden_core::{friendship::Friendship, store::OversightStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub child_id:        Uuid,
  pub friend_child_id: Uuid,
}

/// `POST /friendships` — body: `{"child_id":"...","friend_child_id":"..."}`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OversightStore,
{
  let friendship = store
    .request_friendship(body.child_id, body.friend_child_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(friendship)))
}

/// `GET /friendships/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Friendship>, ApiError>
where
  S: OversightStore,
{
  let friendship = store
    .get_friendship(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Core(warden_core::Error::NotFound))?;
  Ok(Json(friendship))
}

/// `GET /children/:id/friendships` — rows with the child on either side.
pub async fn list_for_child<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Friendship>>, ApiError>
where
  S: OversightStore,
{
  let friendships = store
    .list_friendships(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(friendships))
}
