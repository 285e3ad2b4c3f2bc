//! Handlers for `/children` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/children` | Body: `{"guardian_id":"...","oversight_mode":"monitor"}` |
//! | `GET`  | `/children/:id` | 404 if not found |
//! | `PUT`  | `/children/:id/oversight` | Owning guardian only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use warden_core::{
  child::{Child, OversightMode},
  store::OversightStore,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub guardian_id:    Uuid,
  pub oversight_mode: OversightMode,
}

/// `POST /children`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OversightStore,
{
  let child = store
    .add_child(body.guardian_id, body.oversight_mode)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(child)))
}

/// `GET /children/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Child>, ApiError>
where
  S: OversightStore,
{
  let child = store
    .get_child(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Core(warden_core::Error::NotFound))?;
  Ok(Json(child))
}

#[derive(Debug, Deserialize)]
pub struct SetOversightBody {
  pub guardian_id:    Uuid,
  pub oversight_mode: OversightMode,
}

/// `PUT /children/:id/oversight` — takes effect for every decision made
/// after this call, including messages already waiting for approval.
pub async fn set_oversight<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SetOversightBody>,
) -> Result<Json<Child>, ApiError>
where
  S: OversightStore,
{
  let child = store
    .set_oversight_mode(id, body.guardian_id, body.oversight_mode)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(child))
}
