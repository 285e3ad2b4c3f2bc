//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every store failure funnels through the core taxonomy, so the HTTP
//! mapping is a single match. `Internal` details go to the log, never to
//! the response body.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use warden_core::Error as CoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  /// Fold any backend error into the taxonomy.
  pub fn from_store<E: Into<CoreError>>(e: E) -> Self {
    Self::Core(e.into())
  }

  fn kind(&self) -> &'static str {
    match self {
      Self::Core(CoreError::NotFound) => "not_found",
      Self::Core(CoreError::InvalidAction(_)) => "invalid_action",
      Self::Core(CoreError::AlreadyProcessed) => "already_processed",
      Self::Core(CoreError::NotReady) => "not_ready",
      Self::Core(CoreError::Internal(_)) => "internal",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let Self::Core(core) = &self;
    let status = match core {
      CoreError::NotFound => StatusCode::NOT_FOUND,
      CoreError::InvalidAction(_) => StatusCode::BAD_REQUEST,
      CoreError::AlreadyProcessed | CoreError::NotReady => StatusCode::CONFLICT,
      CoreError::Internal(detail) => {
        tracing::error!(%detail, "storage failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let body = json!({
      "error": { "kind": self.kind(), "message": core.to_string() },
    });
    (status, Json(body)).into_response()
  }
}
