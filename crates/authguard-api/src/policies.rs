//! Handler for `GET /policies`.

use std::sync::Arc;

use authguard_core::{record::SecurityPolicy, store::DocumentStore};
use axum::{Json, extract::State};

use crate::error::ApiError;

pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<SecurityPolicy>>, ApiError>
where
  S: DocumentStore,
{
  let policies = store.list_policies().await.map_err(ApiError::store)?;
  Ok(Json(policies))
}
