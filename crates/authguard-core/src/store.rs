//! The `DocumentStore` and `AccountStore` traits and supporting types.
//!
//! The traits are implemented by storage backends (e.g.
//! `authguard-store-sqlite`). The HTTP layers depend on these abstractions,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  record::{AuthLogRecord, LoginOutcome, NewAuthLog, NewPolicy, SecurityPolicy, UserRecord},
  session::IdentitySession,
};

// ─── Accounts ────────────────────────────────────────────────────────────────

/// A credential record owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
  pub uid:           Uuid,
  pub email:         Option<String>,
  /// argon2 PHC string; `None` for anonymous accounts.
  pub password_hash: Option<String>,
  pub is_anonymous:  bool,
  pub created_at:    DateTime<Utc>,
}

impl Account {
  /// The session this account is signed in as.
  pub fn session(&self) -> IdentitySession {
    IdentitySession {
      subject_id:   self.uid,
      is_anonymous: self.is_anonymous,
      email:        self.email.clone(),
    }
  }
}

/// Input for [`AccountStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         Option<String>,
  pub password_hash: Option<String>,
  pub is_anonymous:  bool,
}

impl NewAccount {
  pub fn anonymous() -> Self {
    Self { email: None, password_hash: None, is_anonymous: true }
  }

  pub fn with_password(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
    Self {
      email:         Some(email.into()),
      password_hash: Some(password_hash.into()),
      is_anonymous:  false,
    }
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`DocumentStore::list_auth_logs`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthLogQuery {
  pub user_id: Option<Uuid>,
  pub limit:   Option<usize>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over the document store backing the dashboard views.
///
/// Auth logs are append-only: there is no update or delete.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert or replace the user record keyed by `user.id`.
  fn upsert_user(
    &self,
    user: UserRecord,
  ) -> impl Future<Output = Result<UserRecord, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + '_;

  /// Users ordered by `last_login` descending; never-logged-in users last.
  fn list_users(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send + '_;

  /// Apply a sign-in outcome: success stamps `last_login` and resets
  /// `failed_attempts`, failure increments it. Returns `None` if no user
  /// record exists for `id`.
  fn record_login(
    &self,
    id: Uuid,
    outcome: LoginOutcome,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + '_;

  // ── Auth logs ─────────────────────────────────────────────────────────

  fn append_auth_log(
    &self,
    input: NewAuthLog,
  ) -> impl Future<Output = Result<AuthLogRecord, Self::Error>> + Send + '_;

  /// Events ordered by timestamp descending.
  fn list_auth_logs<'a>(
    &'a self,
    query: &'a AuthLogQuery,
  ) -> impl Future<Output = Result<Vec<AuthLogRecord>, Self::Error>> + Send + 'a;

  // ── Policies ──────────────────────────────────────────────────────────

  fn put_policy(
    &self,
    input: NewPolicy,
  ) -> impl Future<Output = Result<SecurityPolicy, Self::Error>> + Send + '_;

  fn list_policies(
    &self,
  ) -> impl Future<Output = Result<Vec<SecurityPolicy>, Self::Error>> + Send + '_;
}

/// Credential and session-token storage for the identity provider.
///
/// Layered on [`DocumentStore`] because signing up also creates the user's
/// document.
pub trait AccountStore: DocumentStore {
  /// Persist a new account. Returns `None`, writing nothing, if the email is
  /// already taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Persist a new account and its user document in one atomic write: either
  /// both exist afterwards or neither does. Returns `None`, writing nothing,
  /// if the email is already taken.
  fn create_account_with_user(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Option<(Account, UserRecord)>, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    uid: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn find_account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Record a session token (by digest) for `uid`.
  fn issue_session<'a>(
    &'a self,
    uid: Uuid,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The account a live (unrevoked) token digest belongs to.
  fn resolve_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Revoke a token digest. Returns `false` if it was unknown or already
  /// revoked.
  fn revoke_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
