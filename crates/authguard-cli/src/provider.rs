//! [`IdentityProvider`] over the AuthGuard server's HTTP interface.
//!
//! The current token is persisted to a JSON session file so that a later
//! invocation picks the session back up. Restoring that file is the
//! provider's initialisation: subscribers see nothing until
//! [`HttpIdentityProvider::restore`] has published exactly once.

use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
};

use authguard_core::{
  auth_error::{AuthError, AuthErrorCode},
  provider::{Credential, IdentityChannel, IdentityProvider, IdentitySubscription},
  wire::{EmailPassword, SessionGrant},
};

use crate::client::ApiClient;

/// Cheap to clone; all clones share one identity.
#[derive(Clone)]
pub struct HttpIdentityProvider {
  inner: Arc<Inner>,
}

struct Inner {
  api:          ApiClient,
  session_file: PathBuf,
  identity:     IdentityChannel,
  token:        Mutex<Option<String>>,
}

impl HttpIdentityProvider {
  pub fn new(api: ApiClient, session_file: PathBuf) -> Self {
    Self {
      inner: Arc::new(Inner {
        api,
        session_file,
        identity: IdentityChannel::new(),
        token: Mutex::new(None),
      }),
    }
  }

  /// The bearer token of the current session, if any.
  pub fn token(&self) -> Option<String> {
    self.inner.token.lock().ok().and_then(|t| t.clone())
  }

  fn set_token(&self, token: Option<String>) {
    if let Ok(mut slot) = self.inner.token.lock() {
      *slot = token;
    }
  }

  /// Load the persisted session, confirm it with the server and publish the
  /// result. A token the server rejects is discarded; if the server cannot be
  /// reached the persisted session is trusted as-is.
  pub async fn restore(&self) {
    let restored = match self.read_session_file().await {
      None => None,
      Some(grant) => match self.inner.api.session(&grant.token).await {
        Ok(session) => {
          self.set_token(Some(grant.token));
          Some(session)
        }
        Err(err) if err.code == AuthErrorCode::NetworkRequestFailed => {
          tracing::warn!("server unreachable; using persisted session");
          self.set_token(Some(grant.token));
          Some(grant.session)
        }
        Err(err) => {
          tracing::info!(code = %err.code, "persisted session is no longer valid");
          self.remove_session_file().await;
          None
        }
      },
    };
    self.inner.identity.publish(restored);
  }

  async fn read_session_file(&self) -> Option<SessionGrant> {
    let path = &self.inner.session_file;
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&raw) {
      Ok(grant) => Some(grant),
      Err(e) => {
        tracing::warn!(?path, error = %e, "ignoring unreadable session file");
        None
      }
    }
  }

  async fn write_session_file(&self, grant: &SessionGrant) {
    let path = &self.inner.session_file;
    let result = async {
      if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
      }
      let raw = serde_json::to_vec_pretty(grant)?;
      tokio::fs::write(path, raw).await?;
      Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    }
    .await;
    if let Err(e) = result {
      tracing::warn!(?path, error = %e, "failed to persist session");
    }
  }

  async fn remove_session_file(&self) {
    let path = &self.inner.session_file;
    if let Err(e) = tokio::fs::remove_file(path).await
      && e.kind() != std::io::ErrorKind::NotFound
    {
      tracing::warn!(?path, error = %e, "failed to remove session file");
    }
  }

  /// Make `grant` the current session and tell every subscriber.
  async fn adopt(&self, grant: SessionGrant) -> Credential {
    self.write_session_file(&grant).await;
    self.set_token(Some(grant.token));
    self.inner.identity.publish(Some(grant.session.clone()));
    Credential { session: grant.session }
  }
}

impl IdentityProvider for HttpIdentityProvider {
  fn subscribe(&self) -> IdentitySubscription { self.inner.identity.subscribe() }

  async fn sign_in_anonymously(&self) -> Result<Credential, AuthError> {
    let grant = self.inner.api.sign_in_anonymously().await?;
    Ok(self.adopt(grant).await)
  }

  async fn sign_in_with_email_and_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Credential, AuthError> {
    let body = EmailPassword { email: email.to_owned(), password: password.to_owned() };
    let grant = self.inner.api.sign_in(&body).await?;
    Ok(self.adopt(grant).await)
  }

  async fn create_user_with_email_and_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Credential, AuthError> {
    let body = EmailPassword { email: email.to_owned(), password: password.to_owned() };
    let grant = self.inner.api.sign_up(&body).await?;
    Ok(self.adopt(grant).await)
  }

  async fn sign_out(&self) -> Result<(), AuthError> {
    if let Some(token) = self.token() {
      match self.inner.api.sign_out(&token).await {
        Ok(()) => {}
        Err(err) if err.code == AuthErrorCode::UserTokenExpired => {}
        Err(err) => return Err(err),
      }
    }
    self.set_token(None);
    self.remove_session_file().await;
    self.inner.identity.publish(None);
    Ok(())
  }
}
