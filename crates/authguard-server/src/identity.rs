//! The identity provider's account operations.
//!
//! Handlers are thin wrappers around these functions; seeding reuses them so
//! demo accounts are created exactly the way real ones are.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use authguard_core::{
  auth_error::{AuthError, AuthErrorCode},
  login::is_valid_email,
  record::{AuthLogStatus, LoginOutcome, NewAuthLog},
  store::{Account, AccountStore, NewAccount},
  wire::SessionGrant,
};
use chrono::Utc;
use rand_core::OsRng;

use crate::{
  auth::{generate_token, token_digest},
  error::Error,
};

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Auth-log `method_used` for email/password sign-ins.
pub const PASSWORD_METHOD: &str = "Password";

pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

fn password_matches(account: &Account, password: &str) -> bool {
  let Some(stored) = account.password_hash.as_deref() else {
    return false;
  };
  let Ok(parsed) = PasswordHash::new(stored) else {
    tracing::warn!(uid = %account.uid, "unparseable password hash");
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

async fn grant<S: AccountStore>(store: &S, account: &Account) -> Result<SessionGrant, Error> {
  let token = generate_token();
  store
    .issue_session(account.uid, &token_digest(&token))
    .await
    .map_err(Error::store)?;
  Ok(SessionGrant { token, session: account.session() })
}

// ─── Operations ──────────────────────────────────────────────────────────────

pub async fn sign_in_anonymously<S: AccountStore>(store: &S) -> Result<SessionGrant, Error> {
  let account = store
    .create_account(NewAccount::anonymous())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::auth(AuthErrorCode::Internal))?;
  tracing::info!(uid = %account.uid, "anonymous account created");
  grant(store, &account).await
}

/// Register an email/password account, create its user document and sign
/// in as it.
pub async fn sign_up<S: AccountStore>(
  store:    &S,
  email:    &str,
  password: &str,
) -> Result<SessionGrant, Error> {
  if !is_valid_email(email) {
    return Err(Error::auth(AuthErrorCode::InvalidEmail));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(
      AuthError::new(
        AuthErrorCode::WeakPassword,
        format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
      )
      .into(),
    );
  }
  let hash = hash_password(password)?;
  let (account, _user) = store
    .create_account_with_user(NewAccount::with_password(email, hash))
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::auth(AuthErrorCode::EmailAlreadyInUse))?;

  tracing::info!(uid = %account.uid, %email, "account created");
  grant(store, &account).await
}

/// Check an email/password pair.
///
/// Every attempt is appended to the auth log, and the user document's
/// `last_login` / `failed_attempts` are updated when the account exists.
/// Unknown emails and wrong passwords are indistinguishable to the caller.
pub async fn sign_in<S: AccountStore>(
  store:    &S,
  email:    &str,
  password: &str,
  ip:       &str,
) -> Result<SessionGrant, Error> {
  let account = store
    .find_account_by_email(email)
    .await
    .map_err(Error::store)?;
  let now = Utc::now();

  let outcome = match &account {
    Some(a) if password_matches(a, password) => LoginOutcome::Succeeded,
    _ => LoginOutcome::Failed,
  };
  let user_id = account.as_ref().map(|a| a.uid);

  if let Some(uid) = user_id {
    store
      .record_login(uid, outcome, now)
      .await
      .map_err(Error::store)?;
  }
  store
    .append_auth_log(NewAuthLog {
      user_id,
      timestamp: Some(now),
      method_used: PASSWORD_METHOD.to_owned(),
      ip: ip.to_owned(),
      status: match outcome {
        LoginOutcome::Succeeded => AuthLogStatus::Success,
        LoginOutcome::Failed => AuthLogStatus::Failure,
      },
      threat_detected: false,
    })
    .await
    .map_err(Error::store)?;

  match (account, outcome) {
    (Some(account), LoginOutcome::Succeeded) => grant(store, &account).await,
    _ => {
      tracing::warn!(%email, %ip, "sign-in rejected");
      Err(Error::auth(AuthErrorCode::InvalidCredential))
    }
  }
}

/// Revoke a token digest. Unknown digests are not an error.
pub async fn sign_out<S: AccountStore>(store: &S, token_digest: &str) -> Result<(), Error> {
  let revoked = store
    .revoke_session(token_digest)
    .await
    .map_err(Error::store)?;
  tracing::debug!(revoked, "session ended");
  Ok(())
}

#[cfg(test)]
mod tests {
  use authguard_core::store::DocumentStore;
  use authguard_store_sqlite::SqliteStore;

  use super::*;

  #[tokio::test]
  async fn concurrent_sign_ups_for_one_email_yield_one_account() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let (a, b) = tokio::join!(
      sign_up(&store, "race@example.com", "password123"),
      sign_up(&store, "race@example.com", "password123"),
    );

    let (winner, loser) = match (a, b) {
      (Ok(grant), Err(err)) | (Err(err), Ok(grant)) => (grant, err),
      (a, b) => panic!("expected exactly one success, got {a:?} / {b:?}"),
    };
    assert!(
      matches!(&loser, Error::Auth(e) if e.code == AuthErrorCode::EmailAlreadyInUse),
      "{loser:?}"
    );

    let users = store.list_users(None).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, winner.session.subject_id);
  }

  #[tokio::test]
  async fn sign_up_creates_the_user_document() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let grant = sign_up(&store, "emma.brown@email.com", "password123").await.unwrap();

    let user = store.get_user(grant.session.subject_id).await.unwrap().unwrap();
    assert_eq!(user.email, "emma.brown@email.com");
    assert!(!user.mfa_enabled);
  }
}
