//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | Optional `?limit=`; most recent sign-in first |
//! | `GET`  | `/users/:id` | Owner only; 404 otherwise |

use std::sync::Arc;

use authguard_core::{record::UserRecord, session::IdentitySession, store::DocumentStore};
use axum::{
  Extension, Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /users[?limit=<n>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: DocumentStore,
{
  let users = store.list_users(params.limit).await.map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/:id`
///
/// A user document is readable by its owner only. Anyone else gets the same
/// 404 as for a missing document.
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Extension(session): Extension<IdentitySession>,
  Path(id): Path<Uuid>,
) -> Result<Json<UserRecord>, ApiError>
where
  S: DocumentStore,
{
  let not_found = || ApiError::NotFound(format!("user {id} not found"));
  if session.subject_id != id {
    return Err(not_found());
  }

  let user = store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(user))
}
