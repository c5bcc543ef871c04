//! Error types for `authguard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown route: {0:?}")]
  UnknownRoute(String),

  #[error("unknown auth log status: {0:?}")]
  UnknownLogStatus(String),

  #[error("unknown policy severity: {0:?}")]
  UnknownSeverity(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
