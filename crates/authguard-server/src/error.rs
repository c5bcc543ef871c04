//! Error types and axum `IntoResponse` implementation.
//!
//! Every failure leaves the server as a provider error body,
//! `{"code": "auth/...", "message": "..."}`.

use authguard_core::auth_error::{AuthError, AuthErrorCode};
use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Auth(#[from] AuthError),
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn auth(code: AuthErrorCode) -> Self { Self::Auth(AuthError::from_code(code)) }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

fn status_for(code: &AuthErrorCode) -> StatusCode {
  match code {
    AuthErrorCode::InvalidCredential | AuthErrorCode::UserTokenExpired => {
      StatusCode::UNAUTHORIZED
    }
    AuthErrorCode::InvalidEmail | AuthErrorCode::WeakPassword => StatusCode::BAD_REQUEST,
    AuthErrorCode::EmailAlreadyInUse => StatusCode::CONFLICT,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let body = match self {
      Error::Auth(e) => e,
      Error::Hash(msg) => {
        tracing::error!(%msg, "password hashing failed");
        AuthError::from_code(AuthErrorCode::Internal)
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure");
        AuthError::from_code(AuthErrorCode::Internal)
      }
    };

    let status = status_for(&body.code);
    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"authguard\""),
      );
    }
    res
  }
}
