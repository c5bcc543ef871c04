//! `POST /auth/sign-in`: exchange an email and password for a session.

use authguard_core::{store::AccountStore, wire::{EmailPassword, SessionGrant}};
use axum::{Json, extract::State};

use crate::{AppState, auth::ClientIp, error::Error, identity};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  Json(body): Json<EmailPassword>,
) -> Result<Json<SessionGrant>, Error>
where
  S: AccountStore + Clone + 'static,
{
  let grant = identity::sign_in(state.store.as_ref(), &body.email, &body.password, &ip).await?;
  Ok(Json(grant))
}
