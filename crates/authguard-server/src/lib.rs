//! AuthGuard identity provider and document API server.
//!
//! Serves the provider endpoints under `/auth` and mounts
//! [`authguard_api`] under `/api` behind a session check. Both are backed by
//! any [`AccountStore`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod seed;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use authguard_core::store::AccountStore;
use axum::{
  Router,
  extract::{Request, State},
  middleware::{self, Next},
  response::Response,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{session, sign_in, sign_up};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: AccountStore> {
  pub store: Arc<S>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AccountStore + Clone + 'static,
{
  let api = authguard_api::api_router(state.store.clone()).layer(
    middleware::from_fn_with_state(state.clone(), require_session::<S>),
  );

  Router::new()
    .route("/auth/anonymous", post(session::anonymous::<S>))
    .route("/auth/sign-in",   post(sign_in::handler::<S>))
    .route("/auth/sign-up",   post(sign_up::handler::<S>))
    .route("/auth/session",   get(session::current).delete(session::sign_out::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

/// Reject requests without a live session; otherwise hand the session to
/// downstream handlers as a request extension.
async fn require_session<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error>
where
  S: AccountStore + Clone + 'static,
{
  let principal = auth::authenticate(&state, req.headers()).await?;
  req.extensions_mut().insert(principal.account.session());
  Ok(next.run(req).await)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use authguard_core::{
    auth_error::{AuthError, AuthErrorCode},
    record::{AuthLogRecord, AuthLogStatus, UserRecord},
    session::IdentitySession,
    store::DocumentStore,
    wire::SessionGrant,
  };
  use authguard_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::json;
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    AppState { store: Arc::new(SqliteStore::open_in_memory().await.unwrap()) }
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<serde_json::Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json<T: serde::de::DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn sign_up(state: &AppState<SqliteStore>, email: &str, password: &str) -> Response {
    send(
      state,
      "POST",
      "/auth/sign-up",
      None,
      Some(json!({ "email": email, "password": password })),
    )
    .await
  }

  async fn sign_in(state: &AppState<SqliteStore>, email: &str, password: &str) -> Response {
    send(
      state,
      "POST",
      "/auth/sign-in",
      None,
      Some(json!({ "email": email, "password": password })),
    )
    .await
  }

  // ── Anonymous ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymous_sign_in_issues_resolvable_token() {
    let state = make_state().await;

    let resp = send(&state, "POST", "/auth/anonymous", None, None).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let grant: SessionGrant = json(resp).await;
    assert!(grant.session.is_anonymous);
    assert_eq!(grant.session.email, None);

    let resp = send(&state, "GET", "/auth/session", Some(&grant.token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let session: IdentitySession = json(resp).await;
    assert_eq!(session, grant.session);
  }

  // ── Sign-up ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sign_up_creates_account_and_user_document() {
    let state = make_state().await;

    let resp = sign_up(&state, "emma.brown@email.com", "password123").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let grant: SessionGrant = json(resp).await;
    assert!(!grant.session.is_anonymous);

    let resp = send(
      &state,
      "GET",
      &format!("/api/users/{}", grant.session.subject_id),
      Some(&grant.token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user: UserRecord = json(resp).await;
    assert_eq!(user.email, "emma.brown@email.com");
    assert_eq!(user.failed_attempts, 0);
  }

  #[tokio::test]
  async fn sign_up_validation_codes() {
    let state = make_state().await;

    let resp = sign_up(&state, "not-an-email", "password123").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json::<AuthError>(resp).await.code, AuthErrorCode::InvalidEmail);

    let resp = sign_up(&state, "a@b.co", "12345").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json::<AuthError>(resp).await.code, AuthErrorCode::WeakPassword);

    sign_up(&state, "a@b.co", "123456").await;
    let resp = sign_up(&state, "a@b.co", "123456").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json::<AuthError>(resp).await.code, AuthErrorCode::EmailAlreadyInUse);
  }

  // ── Sign-in ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sign_in_with_correct_password() {
    let state = make_state().await;
    sign_up(&state, "liam.johnson@email.com", "password123").await;

    let resp = sign_in(&state, "liam.johnson@email.com", "password123").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let grant: SessionGrant = json(resp).await;
    assert_eq!(grant.session.email.as_deref(), Some("liam.johnson@email.com"));

    let user = state
      .store
      .get_user(grant.session.subject_id)
      .await
      .unwrap()
      .unwrap();
    assert!(user.last_login.is_some());
  }

  #[tokio::test]
  async fn wrong_password_and_unknown_email_look_the_same() {
    let state = make_state().await;
    sign_up(&state, "noah.williams@email.com", "password123").await;

    let wrong = sign_in(&state, "noah.williams@email.com", "wrongpass").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.headers().contains_key(header::WWW_AUTHENTICATE));
    let wrong: AuthError = json(wrong).await;

    let unknown = sign_in(&state, "nobody@email.com", "wrongpass").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown: AuthError = json(unknown).await;

    assert_eq!(wrong, unknown);
    assert_eq!(wrong.code, AuthErrorCode::InvalidCredential);
  }

  #[tokio::test]
  async fn failed_sign_in_is_logged_and_counted() {
    let state = make_state().await;
    let resp = sign_up(&state, "olivia.martin@email.com", "password123").await;
    let grant: SessionGrant = json(resp).await;
    let uid = grant.session.subject_id;

    sign_in(&state, "olivia.martin@email.com", "nope-nope").await;
    sign_in(&state, "olivia.martin@email.com", "nope-nope").await;

    let user = state.store.get_user(uid).await.unwrap().unwrap();
    assert_eq!(user.failed_attempts, 2);

    let resp = send(
      &state,
      "GET",
      &format!("/api/auth-logs?user_id={uid}"),
      Some(&grant.token),
      None,
    )
    .await;
    let logs: Vec<AuthLogRecord> = json(resp).await;
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == AuthLogStatus::Failure));
    assert!(logs.iter().all(|l| l.ip == "unknown"));
  }

  // ── Sign-out ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sign_out_revokes_token() {
    let state = make_state().await;
    let grant: SessionGrant = json(send(&state, "POST", "/auth/anonymous", None, None).await).await;

    let resp = send(&state, "DELETE", "/auth/session", Some(&grant.token), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", "/auth/session", Some(&grant.token), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json::<AuthError>(resp).await.code, AuthErrorCode::UserTokenExpired);
  }

  // ── Document routes ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn api_requires_a_session() {
    let state = make_state().await;

    let resp = send(&state, "GET", "/api/users", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&state, "GET", "/api/users", Some("forged-token"), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn anonymous_session_can_read_documents() {
    let state = make_state().await;
    sign_up(&state, "svc-runner@os.local", "password123").await;
    let grant: SessionGrant = json(send(&state, "POST", "/auth/anonymous", None, None).await).await;

    let resp = send(&state, "GET", "/api/users", Some(&grant.token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<UserRecord> = json(resp).await;
    assert_eq!(users.len(), 1);
  }

  #[tokio::test]
  async fn user_document_is_owner_only() {
    let state = make_state().await;
    let owner: SessionGrant = json(sign_up(&state, "a@b.co", "123456").await).await;
    let other: SessionGrant = json(send(&state, "POST", "/auth/anonymous", None, None).await).await;

    let uri = format!("/api/users/{}", owner.session.subject_id);
    let resp = send(&state, "GET", &uri, Some(&other.token), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
