//! Request and response bodies of the identity provider's HTTP interface,
//! shared by the server and its clients.

use serde::{Deserialize, Serialize};

use crate::session::IdentitySession;

/// Body of `POST /auth/sign-in` and `POST /auth/sign-up`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPassword {
  pub email:    String,
  pub password: String,
}

/// A freshly issued bearer token and the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
  pub token:   String,
  pub session: IdentitySession,
}
