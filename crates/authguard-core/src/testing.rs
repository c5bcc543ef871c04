//! In-memory identity provider for unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  auth_error::{AuthError, AuthErrorCode},
  provider::{Credential, IdentityChannel, IdentityProvider, IdentitySubscription},
  session::IdentitySession,
};

#[derive(Clone)]
pub struct FakeProvider {
  inner: Arc<Inner>,
}

struct Inner {
  identity:        IdentityChannel,
  accounts:        Mutex<HashMap<String, (String, Uuid)>>,
  anonymous_calls: AtomicUsize,
  sign_in_calls:   AtomicUsize,
  /// Provider calls wait until this is `true`.
  open:            watch::Sender<bool>,
}

impl FakeProvider {
  /// A provider that has not reported anything yet.
  pub fn initializing() -> Self {
    let (open, _) = watch::channel(true);
    Self {
      inner: Arc::new(Inner {
        identity: IdentityChannel::new(),
        accounts: Mutex::new(HashMap::new()),
        anonymous_calls: AtomicUsize::new(0),
        sign_in_calls: AtomicUsize::new(0),
        open,
      }),
    }
  }

  /// A provider that has already restored `session`.
  pub fn resolved(session: Option<IdentitySession>) -> Self {
    let provider = Self::initializing();
    provider.publish(session);
    provider
  }

  pub fn publish(&self, session: Option<IdentitySession>) {
    self.inner.identity.publish(session);
  }

  pub fn register(&self, email: &str, password: &str) -> Uuid {
    let id = Uuid::new_v4();
    self
      .inner
      .accounts
      .lock()
      .unwrap()
      .insert(email.to_owned(), (password.to_owned(), id));
    id
  }

  /// Make every subsequent call wait until [`release`](Self::release).
  pub fn hold(&self) { self.inner.open.send_replace(false); }

  pub fn release(&self) { self.inner.open.send_replace(true); }

  pub fn anonymous_calls(&self) -> usize {
    self.inner.anonymous_calls.load(Ordering::SeqCst)
  }

  pub fn sign_in_calls(&self) -> usize {
    self.inner.sign_in_calls.load(Ordering::SeqCst)
  }

  async fn gate(&self) {
    let mut rx = self.inner.open.subscribe();
    let _ = rx.wait_for(|open| *open).await;
  }
}

impl IdentityProvider for FakeProvider {
  fn subscribe(&self) -> IdentitySubscription { self.inner.identity.subscribe() }

  async fn sign_in_anonymously(&self) -> Result<Credential, AuthError> {
    self.inner.anonymous_calls.fetch_add(1, Ordering::SeqCst);
    self.gate().await;
    let session = IdentitySession::anonymous(Uuid::new_v4());
    self.publish(Some(session.clone()));
    Ok(Credential { session })
  }

  async fn sign_in_with_email_and_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> Result<Credential, AuthError> {
    self.inner.sign_in_calls.fetch_add(1, Ordering::SeqCst);
    self.gate().await;
    let found = self.inner.accounts.lock().unwrap().get(email).cloned();
    match found {
      Some((stored, id)) if stored == password => {
        let session = IdentitySession::authenticated(id, email);
        self.publish(Some(session.clone()));
        Ok(Credential { session })
      }
      _ => Err(AuthError::new(
        AuthErrorCode::InvalidCredential,
        "AuthGuard: Error (auth/invalid-credential).",
      )),
    }
  }

  async fn create_user_with_email_and_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> Result<Credential, AuthError> {
    self.gate().await;
    if self.inner.accounts.lock().unwrap().contains_key(email) {
      return Err(AuthError::from_code(AuthErrorCode::EmailAlreadyInUse));
    }
    let id = self.register(email, password);
    let session = IdentitySession::authenticated(id, email);
    self.publish(Some(session.clone()));
    Ok(Credential { session })
  }

  async fn sign_out(&self) -> Result<(), AuthError> {
    self.publish(None);
    Ok(())
  }
}
