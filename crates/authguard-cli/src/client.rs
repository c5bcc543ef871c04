//! Async HTTP client wrapping the AuthGuard server.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use authguard_core::{
  auth_error::{AuthError, AuthErrorCode},
  record::{AuthLogRecord, DashboardSummary, SecurityPolicy, UserRecord},
  session::IdentitySession,
  store::AuthLogQuery,
  wire::{EmailPassword, SessionGrant},
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Async HTTP client for the AuthGuard provider and document APIs.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

fn network_error(err: reqwest::Error) -> AuthError {
  tracing::debug!(error = %err, "provider request failed");
  AuthError::from_code(AuthErrorCode::NetworkRequestFailed)
}

/// Decode a provider response: the success body, or the provider error the
/// server sent back.
async fn provider_result<T: DeserializeOwned>(resp: Response) -> Result<T, AuthError> {
  if resp.status().is_success() {
    return resp.json().await.map_err(network_error);
  }
  let status = resp.status();
  match resp.json::<AuthError>().await {
    Ok(err) => Err(err),
    Err(_) => Err(AuthError::new(
      AuthErrorCode::Internal,
      format!("AuthGuard: unexpected response ({status})."),
    )),
  }
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }

  // ── Provider ──────────────────────────────────────────────────────────────

  /// `POST /auth/anonymous`
  pub async fn sign_in_anonymously(&self) -> Result<SessionGrant, AuthError> {
    let resp = self
      .client
      .post(self.url("/auth/anonymous"))
      .send()
      .await
      .map_err(network_error)?;
    provider_result(resp).await
  }

  /// `POST /auth/sign-in`
  pub async fn sign_in(&self, body: &EmailPassword) -> Result<SessionGrant, AuthError> {
    let resp = self
      .client
      .post(self.url("/auth/sign-in"))
      .json(body)
      .send()
      .await
      .map_err(network_error)?;
    provider_result(resp).await
  }

  /// `POST /auth/sign-up`
  pub async fn sign_up(&self, body: &EmailPassword) -> Result<SessionGrant, AuthError> {
    let resp = self
      .client
      .post(self.url("/auth/sign-up"))
      .json(body)
      .send()
      .await
      .map_err(network_error)?;
    provider_result(resp).await
  }

  /// `GET /auth/session`
  pub async fn session(&self, token: &str) -> Result<IdentitySession, AuthError> {
    let resp = self
      .client
      .get(self.url("/auth/session"))
      .bearer_auth(token)
      .send()
      .await
      .map_err(network_error)?;
    provider_result(resp).await
  }

  /// `DELETE /auth/session`
  pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
    let resp = self
      .client
      .delete(self.url("/auth/session"))
      .bearer_auth(token)
      .send()
      .await
      .map_err(network_error)?;
    if resp.status().is_success() {
      return Ok(());
    }
    provider_result::<serde_json::Value>(resp).await.map(|_| ())
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = req.send().await.with_context(|| format!("GET {what} failed"))?;
    if !resp.status().is_success() {
      return Err(anyhow!("GET {what} → {}", resp.status()));
    }
    resp.json().await.with_context(|| format!("deserialising {what}"))
  }

  /// `GET /api/users[?limit=<n>]`
  pub async fn list_users(&self, token: &str, limit: Option<usize>) -> Result<Vec<UserRecord>> {
    let mut req = self.client.get(self.url("/api/users")).bearer_auth(token);
    if let Some(limit) = limit {
      req = req.query(&[("limit", limit)]);
    }
    self.get_json(req, "/users").await
  }

  /// `GET /api/auth-logs[?user_id=<id>][&limit=<n>]`
  pub async fn list_auth_logs(
    &self,
    token: &str,
    query: &AuthLogQuery,
  ) -> Result<Vec<AuthLogRecord>> {
    let mut params = Vec::new();
    if let Some(user_id) = query.user_id {
      params.push(("user_id", user_id.to_string()));
    }
    if let Some(limit) = query.limit {
      params.push(("limit", limit.to_string()));
    }
    let req = self
      .client
      .get(self.url("/api/auth-logs"))
      .bearer_auth(token)
      .query(&params);
    self.get_json(req, "/auth-logs").await
  }

  /// `GET /api/policies`
  pub async fn list_policies(&self, token: &str) -> Result<Vec<SecurityPolicy>> {
    let req = self.client.get(self.url("/api/policies")).bearer_auth(token);
    self.get_json(req, "/policies").await
  }

  /// `GET /api/dashboard`
  pub async fn dashboard(&self, token: &str) -> Result<DashboardSummary> {
    let req = self.client.get(self.url("/api/dashboard")).bearer_auth(token);
    self.get_json(req, "/dashboard").await
  }
}
