//! Non-blocking initiators for identity-provider operations.
//!
//! Each initiator spawns the provider call onto the tokio runtime and returns
//! immediately. Results come back only through the supplied continuations;
//! identity changes arrive through the provider's subscription.

use tokio::task::JoinHandle;

use crate::{
  auth_error::AuthError,
  provider::{Credential, IdentityProvider},
};

/// Start an anonymous sign-in. The outcome is not reported to the caller.
///
/// The returned handle only tells whether the request is still outstanding;
/// dropping it does not cancel anything.
pub fn initiate_anonymous_sign_in<P>(provider: &P) -> JoinHandle<()>
where
  P: IdentityProvider + Clone + 'static,
{
  let provider = provider.clone();
  tokio::spawn(async move {
    match provider.sign_in_anonymously().await {
      Ok(credential) => {
        tracing::debug!(subject_id = %credential.session.subject_id, "anonymous sign-in completed");
      }
      Err(err) => tracing::warn!(code = %err.code, "anonymous sign-in failed: {}", err.message),
    }
  })
}

/// Start an email/password sign-in.
pub fn initiate_email_sign_in<P, S, E>(
  provider:   &P,
  email:      impl Into<String>,
  password:   impl Into<String>,
  on_success: S,
  on_error:   E,
) -> JoinHandle<()>
where
  P: IdentityProvider + Clone + 'static,
  S: FnOnce(Credential) + Send + 'static,
  E: FnOnce(AuthError) + Send + 'static,
{
  let provider = provider.clone();
  let email    = email.into();
  let password = password.into();
  tokio::spawn(async move {
    let result = provider
      .sign_in_with_email_and_password(&email, &password)
      .await;
    settle(result, on_success, on_error);
  })
}

/// Start an email/password sign-up.
pub fn initiate_email_sign_up<P, S, E>(
  provider:   &P,
  email:      impl Into<String>,
  password:   impl Into<String>,
  on_success: S,
  on_error:   E,
) -> JoinHandle<()>
where
  P: IdentityProvider + Clone + 'static,
  S: FnOnce(Credential) + Send + 'static,
  E: FnOnce(AuthError) + Send + 'static,
{
  let provider = provider.clone();
  let email    = email.into();
  let password = password.into();
  tokio::spawn(async move {
    let result = provider
      .create_user_with_email_and_password(&email, &password)
      .await;
    settle(result, on_success, on_error);
  })
}

fn settle<S, E>(result: Result<Credential, AuthError>, on_success: S, on_error: E)
where
  S: FnOnce(Credential),
  E: FnOnce(AuthError),
{
  match result {
    Ok(credential) => on_success(credential),
    Err(err) => on_error(err),
  }
}

#[cfg(test)]
mod tests {
  use tokio::sync::oneshot;

  use super::*;
  use crate::{
    auth_error::AuthErrorCode,
    session::IdentitySession,
    testing::FakeProvider,
  };

  #[tokio::test]
  async fn sign_in_success_reaches_success_continuation() {
    let provider = FakeProvider::resolved(None);
    provider.register("user@example.com", "hunter22");

    let (tx, rx) = oneshot::channel();
    let _ = initiate_email_sign_in(
      &provider,
      "user@example.com",
      "hunter22",
      move |c| { let _ = tx.send(Ok(c)); },
      |_| panic!("unexpected error"),
    );

    let credential: Result<Credential, AuthError> = rx.await.unwrap();
    assert!(!credential.unwrap().session.is_anonymous);
  }

  #[tokio::test]
  async fn sign_up_error_reaches_error_continuation() {
    let provider = FakeProvider::resolved(None);
    provider.register("taken@example.com", "hunter22");

    let (tx, rx) = oneshot::channel();
    let _ = initiate_email_sign_up(
      &provider,
      "taken@example.com",
      "whatever",
      |_| panic!("unexpected success"),
      move |e| { let _ = tx.send(e); },
    );

    assert_eq!(rx.await.unwrap().code, AuthErrorCode::EmailAlreadyInUse);
  }

  #[tokio::test]
  async fn anonymous_result_arrives_through_subscription() {
    let provider = FakeProvider::resolved(None);
    let mut sub = provider.subscribe();
    assert_eq!(sub.next().await, Some(None));

    let _ = initiate_anonymous_sign_in(&provider);

    let report = sub.next().await.unwrap();
    assert!(report.as_ref().is_some_and(|s: &IdentitySession| s.is_anonymous));
    assert_eq!(provider.anonymous_calls(), 1);
  }
}
