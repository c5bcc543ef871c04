//! Handlers for the session itself.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/auth/anonymous` | New anonymous account; 201 + grant |
//! | `GET`    | `/auth/session` | The bearer token's session; 401 if revoked |
//! | `DELETE` | `/auth/session` | Revoke the bearer token; 204 |

use authguard_core::{session::IdentitySession, store::AccountStore};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{AppState, auth::Principal, error::Error, identity};

pub async fn anonymous<S>(State(state): State<AppState<S>>) -> Result<impl IntoResponse, Error>
where
  S: AccountStore + Clone + 'static,
{
  let grant = identity::sign_in_anonymously(state.store.as_ref()).await?;
  Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn current(principal: Principal) -> Json<IdentitySession> {
  Json(principal.account.session())
}

pub async fn sign_out<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
) -> Result<StatusCode, Error>
where
  S: AccountStore + Clone + 'static,
{
  identity::sign_out(state.store.as_ref(), &principal.token_digest).await?;
  Ok(StatusCode::NO_CONTENT)
}
