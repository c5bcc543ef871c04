//! The `IdentityProvider` trait and its identity-change subscription.
//!
//! A provider owns credential storage and token issuance. Consumers never
//! read identity state from a provider call's return value; they subscribe
//! and let the subscription report every change.

use std::future::Future;

use tokio::sync::watch;

use crate::{auth_error::AuthError, session::IdentitySession};

// ─── Provider-side state ─────────────────────────────────────────────────────

/// What a provider has published so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
  /// Still restoring any persisted session; nothing reported yet.
  Initializing,
  /// The current identity, `None` meaning no session at all.
  Ready(Option<IdentitySession>),
}

/// The publishing half a provider implementation embeds.
///
/// Starts in [`ProviderState::Initializing`]; every [`publish`](Self::publish)
/// wakes all live subscriptions, which then see the latest identity.
#[derive(Debug)]
pub struct IdentityChannel {
  tx: watch::Sender<ProviderState>,
}

impl IdentityChannel {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(ProviderState::Initializing);
    Self { tx }
  }

  pub fn publish(&self, session: Option<IdentitySession>) {
    self.tx.send_replace(ProviderState::Ready(session));
  }

  /// The last published identity, or `None` while initializing.
  pub fn current(&self) -> Option<Option<IdentitySession>> {
    match &*self.tx.borrow() {
      ProviderState::Initializing => None,
      ProviderState::Ready(s) => Some(s.clone()),
    }
  }

  pub fn subscribe(&self) -> IdentitySubscription {
    IdentitySubscription { rx: self.tx.subscribe(), primed: false }
  }
}

impl Default for IdentityChannel {
  fn default() -> Self { Self::new() }
}

/// A persistent identity-change subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct IdentitySubscription {
  rx:     watch::Receiver<ProviderState>,
  primed: bool,
}

impl IdentitySubscription {
  /// Wait for the next identity report.
  ///
  /// The first call returns the current identity immediately if the provider
  /// has already resolved. After that it waits for a publish and returns the
  /// latest identity: publishes made since the previous call collapse into
  /// one report, so intermediate identities may never be seen.
  /// Returns `None` when the provider has been dropped.
  pub async fn next(&mut self) -> Option<Option<IdentitySession>> {
    if !self.primed {
      self.primed = true;
      let state = self.rx.borrow_and_update().clone();
      if let ProviderState::Ready(session) = state {
        return Some(session);
      }
    }

    loop {
      self.rx.changed().await.ok()?;
      let state = self.rx.borrow_and_update().clone();
      if let ProviderState::Ready(session) = state {
        return Some(session);
      }
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
  pub session: IdentitySession,
}

/// Abstraction over a hosted identity provider.
///
/// Every successful operation also publishes the new identity to all
/// subscriptions; callers should rely on that, not on the returned value, for
/// anything but user feedback.
pub trait IdentityProvider: Send + Sync {
  /// Subscribe to identity changes.
  fn subscribe(&self) -> IdentitySubscription;

  /// Create an anonymous session.
  fn sign_in_anonymously(
    &self,
  ) -> impl Future<Output = Result<Credential, AuthError>> + Send + '_;

  /// Sign in with an email and password.
  fn sign_in_with_email_and_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Credential, AuthError>> + Send + 'a;

  /// Register a new email/password account and sign in as it.
  fn create_user_with_email_and_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Credential, AuthError>> + Send + 'a;

  /// End the current session, if any.
  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_;
}
