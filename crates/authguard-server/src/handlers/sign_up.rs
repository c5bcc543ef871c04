//! `POST /auth/sign-up`: register an email/password account.

use authguard_core::{store::AccountStore, wire::EmailPassword};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{AppState, error::Error, identity};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<EmailPassword>,
) -> Result<impl IntoResponse, Error>
where
  S: AccountStore + Clone + 'static,
{
  let grant = identity::sign_up(state.store.as_ref(), body.email.trim(), &body.password).await?;
  Ok((StatusCode::CREATED, Json(grant)))
}
