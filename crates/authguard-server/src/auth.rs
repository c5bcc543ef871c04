//! Bearer tokens and the extractors built on them.
//!
//! Tokens are 32 random bytes, base64url-encoded without padding. The store
//! only ever sees their SHA-256 digest.

use std::{convert::Infallible, net::SocketAddr};

use authguard_core::{
  auth_error::AuthErrorCode,
  store::{Account, AccountStore},
};
use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::Error};

const TOKEN_BYTES: usize = 32;

/// Generate a fresh bearer token.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The hex SHA-256 digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Principal ───────────────────────────────────────────────────────────────

/// The account behind a live bearer token.
pub struct Principal {
  pub account:      Account,
  pub token_digest: String,
}

/// Resolve the request's bearer token. Missing, unknown and revoked tokens
/// all fail with `auth/user-token-expired`.
pub async fn authenticate<S>(state: &AppState<S>, headers: &HeaderMap) -> Result<Principal, Error>
where
  S: AccountStore + Clone + 'static,
{
  let token = bearer_token(headers).ok_or_else(|| Error::auth(AuthErrorCode::UserTokenExpired))?;
  let digest = token_digest(token);

  let account = state
    .store
    .resolve_session(&digest)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::auth(AuthErrorCode::UserTokenExpired))?;

  Ok(Principal { account, token_digest: digest })
}

impl<S> FromRequestParts<AppState<S>> for Principal
where
  S: AccountStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(state, &parts.headers).await
  }
}

// ─── Client address ──────────────────────────────────────────────────────────

/// The caller's address as recorded in auth logs: the first
/// `X-Forwarded-For` hop, else the socket peer, else `"unknown"`.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let forwarded = parts
      .headers
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.split(',').next())
      .map(|v| v.trim().to_owned())
      .filter(|v| !v.is_empty());

    let ip = forwarded
      .or_else(|| {
        parts
          .extensions
          .get::<ConnectInfo<SocketAddr>>()
          .map(|ConnectInfo(addr)| addr.ip().to_string())
      })
      .unwrap_or_else(|| "unknown".to_owned());

    Ok(Self(ip))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, Request};

  #[test]
  fn tokens_are_unique_and_url_safe() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn digest_is_hex_sha256() {
    let digest = token_digest("abc");
    assert_eq!(
      digest,
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn bearer_header_parsing() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-123"));
    assert_eq!(bearer_token(&headers), Some("tok-123"));
  }

  #[tokio::test]
  async fn client_ip_prefers_forwarded_header() {
    let req = Request::builder()
      .header("x-forwarded-for", "203.0.113.45, 10.0.0.1")
      .body(())
      .unwrap();
    let (mut parts, _) = req.into_parts();
    let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(ip, "203.0.113.45");
  }

  #[tokio::test]
  async fn client_ip_falls_back_to_peer_address() {
    let mut req = Request::builder().body(()).unwrap();
    req
      .extensions_mut()
      .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 10], 40000))));
    let (mut parts, _) = req.into_parts();
    let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(ip, "192.168.1.10");
  }
}
