//! Handlers for `/auth-logs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/auth-logs` | Optional `?user_id=` and `?limit=`; newest first |
//! | `POST` | `/auth-logs` | Body: [`NewAuthLog`]; returns 201 + stored event |
//!
//! The log is append-only; there is no update or delete route.

use std::sync::Arc;

use authguard_core::{
  record::{AuthLogRecord, NewAuthLog},
  store::{AuthLogQuery, DocumentStore},
};
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};

use crate::error::ApiError;

/// `GET /auth-logs[?user_id=<id>][&limit=<n>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(query): Query<AuthLogQuery>,
) -> Result<Json<Vec<AuthLogRecord>>, ApiError>
where
  S: DocumentStore,
{
  let logs = store.list_auth_logs(&query).await.map_err(ApiError::store)?;
  Ok(Json(logs))
}

/// `POST /auth-logs`
pub async fn append<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewAuthLog>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  if body.method_used.trim().is_empty() {
    return Err(ApiError::BadRequest("methodUsed must not be empty".into()));
  }
  let record = store.append_auth_log(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}
