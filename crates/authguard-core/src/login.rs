//! The login form: validation, submission gating and user notices.
//!
//! Submitting dispatches a non-blocking email sign-in. The form never
//! navigates on success; it only raises a notice and leaves the redirect to
//! whoever watches the session channel. The submit control stays disabled
//! until the error continuation re-enables it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::{
  auth_error::AuthError,
  dispatch::initiate_email_sign_in,
  provider::IdentityProvider,
};

// ─── Values and validation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginValues {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
  #[error("Please enter a valid email address.")]
  InvalidEmail,

  #[error("Password is required.")]
  PasswordRequired,

  /// The submit control is disabled while a sign-in is outstanding.
  #[error("a sign-in attempt is already in progress")]
  SubmitDisabled,
}

/// A loose `local@domain.tld` check.
pub fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !email.chars().any(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

impl LoginValues {
  pub fn validate(&self) -> Result<(), FormError> {
    if !is_valid_email(&self.email) {
      return Err(FormError::InvalidEmail);
    }
    if self.password.is_empty() {
      return Err(FormError::PasswordRequired);
    }
    Ok(())
  }
}

// ─── Notices ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
  Default,
  Destructive,
}

/// A transient message for the user (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub variant:     NoticeVariant,
  pub title:       String,
  pub description: String,
}

impl Notice {
  pub fn login_succeeded() -> Self {
    Self {
      variant:     NoticeVariant::Default,
      title:       "Login Successful".into(),
      description: "You will be redirected to the dashboard shortly.".into(),
    }
  }

  pub fn login_failed(err: &AuthError) -> Self {
    Self {
      variant:     NoticeVariant::Destructive,
      title:       "Login Failed".into(),
      description: err.user_message().into_owned(),
    }
  }
}

// ─── Form ────────────────────────────────────────────────────────────────────

pub struct LoginForm<P> {
  provider:   P,
  submitting: Arc<watch::Sender<bool>>,
  notices:    mpsc::UnboundedSender<Notice>,
}

impl<P> LoginForm<P>
where
  P: IdentityProvider + Clone + 'static,
{
  pub fn new(provider: P, notices: mpsc::UnboundedSender<Notice>) -> Self {
    let (submitting, _) = watch::channel(false);
    Self { provider, submitting: Arc::new(submitting), notices }
  }

  pub fn is_submitting(&self) -> bool { *self.submitting.borrow() }

  /// Follow the submit control's disabled flag.
  pub fn submitting(&self) -> watch::Receiver<bool> { self.submitting.subscribe() }

  /// Validate and dispatch a sign-in. Returns as soon as it is dispatched.
  pub fn submit(&self, values: LoginValues) -> Result<(), FormError> {
    if self.is_submitting() {
      return Err(FormError::SubmitDisabled);
    }
    values.validate()?;

    self.submitting.send_replace(true);
    tracing::debug!(email = %values.email, "dispatching sign-in");

    let success_notices = self.notices.clone();
    let error_notices   = self.notices.clone();
    let submitting      = Arc::clone(&self.submitting);

    // The detached task keeps running if the form is dropped.
    let _ = initiate_email_sign_in(
      &self.provider,
      values.email,
      values.password,
      move |_credential| {
        // The session subscription performs the redirect; stay disabled.
        let _ = success_notices.send(Notice::login_succeeded());
      },
      move |err| {
        tracing::warn!(code = %err.code, "sign-in failed: {}", err.message);
        let _ = error_notices.send(Notice::login_failed(&err));
        submitting.send_replace(false);
      },
    );
    Ok(())
  }
}
