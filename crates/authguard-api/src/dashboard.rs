//! Handler for `GET /dashboard`.

use std::sync::Arc;

use authguard_core::{
  record::DashboardSummary,
  store::{AuthLogQuery, DocumentStore},
};
use axum::{Json, extract::State};
use chrono::Utc;

use crate::error::ApiError;

pub async fn handler<S>(State(store): State<Arc<S>>) -> Result<Json<DashboardSummary>, ApiError>
where
  S: DocumentStore,
{
  let users = store.list_users(None).await.map_err(ApiError::store)?;
  let logs = store
    .list_auth_logs(&AuthLogQuery::default())
    .await
    .map_err(ApiError::store)?;

  Ok(Json(DashboardSummary::from_records(&users, &logs, Utc::now())))
}
