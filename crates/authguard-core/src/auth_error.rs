//! Identity-provider errors and how they are surfaced to the user.

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

/// Message shown for a wrong email/password combination.
pub const INVALID_CREDENTIAL_MESSAGE: &str =
  "Invalid email or password. Please try again.";

/// Provider error codes, as they travel on the wire (`auth/<name>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
  InvalidCredential,
  InvalidEmail,
  WeakPassword,
  EmailAlreadyInUse,
  UserTokenExpired,
  NetworkRequestFailed,
  Internal,
  /// Any code this crate does not know by name.
  Other(String),
}

impl AuthErrorCode {
  pub fn as_str(&self) -> &str {
    match self {
      Self::InvalidCredential => "auth/invalid-credential",
      Self::InvalidEmail => "auth/invalid-email",
      Self::WeakPassword => "auth/weak-password",
      Self::EmailAlreadyInUse => "auth/email-already-in-use",
      Self::UserTokenExpired => "auth/user-token-expired",
      Self::NetworkRequestFailed => "auth/network-request-failed",
      Self::Internal => "auth/internal-error",
      Self::Other(code) => code,
    }
  }
}

impl From<&str> for AuthErrorCode {
  fn from(code: &str) -> Self {
    match code {
      "auth/invalid-credential" => Self::InvalidCredential,
      "auth/invalid-email" => Self::InvalidEmail,
      "auth/weak-password" => Self::WeakPassword,
      "auth/email-already-in-use" => Self::EmailAlreadyInUse,
      "auth/user-token-expired" => Self::UserTokenExpired,
      "auth/network-request-failed" => Self::NetworkRequestFailed,
      "auth/internal-error" => Self::Internal,
      other => Self::Other(other.to_owned()),
    }
  }
}

impl fmt::Display for AuthErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for AuthErrorCode {
  fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for AuthErrorCode {
  fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(Self::from(raw.as_str()))
  }
}

/// An error reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct AuthError {
  pub code:    AuthErrorCode,
  /// The provider's raw message text.
  pub message: String,
}

impl AuthError {
  pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
    Self { code, message: message.into() }
  }

  /// A provider error carrying the default message for `code`.
  pub fn from_code(code: AuthErrorCode) -> Self {
    let message = format!("AuthGuard: Error ({code}).");
    Self { code, message }
  }

  pub fn kind(&self) -> LoginFailure {
    match self.code {
      AuthErrorCode::InvalidCredential => LoginFailure::InvalidCredential,
      _ => LoginFailure::Provider,
    }
  }

  /// The text shown to the user for this error.
  ///
  /// Only `auth/invalid-credential` is rewritten; every other provider
  /// message is passed through verbatim.
  pub fn user_message(&self) -> Cow<'_, str> {
    match self.kind() {
      LoginFailure::InvalidCredential => Cow::Borrowed(INVALID_CREDENTIAL_MESSAGE),
      LoginFailure::Provider => Cow::Borrowed(self.message.as_str()),
    }
  }
}

/// The two classes of failure a user can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
  InvalidCredential,
  Provider,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_credential_gets_fixed_message() {
    let err = AuthError::new(
      AuthErrorCode::from("auth/invalid-credential"),
      "AuthGuard: Error (auth/invalid-credential).",
    );
    assert_eq!(err.kind(), LoginFailure::InvalidCredential);
    assert_eq!(err.user_message(), INVALID_CREDENTIAL_MESSAGE);
  }

  #[test]
  fn other_codes_pass_raw_message_through() {
    for code in ["auth/too-many-requests", "auth/network-request-failed", "auth/weak-password"] {
      let raw = format!("raw text for {code}");
      let err = AuthError::new(AuthErrorCode::from(code), raw.clone());
      assert_eq!(err.kind(), LoginFailure::Provider);
      assert_eq!(err.user_message(), raw);
    }
  }

  #[test]
  fn unknown_codes_survive_the_wire() {
    let json = r#"{"code":"auth/too-many-requests","message":"slow down"}"#;
    let err: AuthError = serde_json::from_str(json).unwrap();
    assert_eq!(err.code, AuthErrorCode::Other("auth/too-many-requests".into()));
    assert_eq!(serde_json::to_string(&err).unwrap(), json);
  }

  #[test]
  fn default_message_names_the_code() {
    let err = AuthError::from_code(AuthErrorCode::EmailAlreadyInUse);
    assert_eq!(err.message, "AuthGuard: Error (auth/email-already-in-use).");
  }
}
