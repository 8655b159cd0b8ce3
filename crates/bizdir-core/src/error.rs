//! Error types for `bizdir-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::connection::{ConnectionAction, ConnectionState};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("company not found: {0}")]
  CompanyNotFound(Uuid),

  #[error("connection not found: {0}")]
  ConnectionNotFound(Uuid),

  #[error("a connection request from {sender} to {receiver} already exists")]
  DuplicateRequest { sender: Uuid, receiver: Uuid },

  #[error("a company cannot connect to itself")]
  SelfConnection,

  #[error("connection {id} is already {from}; cannot {action}")]
  InvalidTransition {
    id:     Uuid,
    from:   ConnectionState,
    action: ConnectionAction,
  },

  #[error("only the receiver of connection {0} may act on it")]
  NotReceiver(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error category shared by every layer. Outer layers map this to a
/// transport status and a stable error code without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Duplicate,
  InvalidTransition,
  Forbidden,
  /// Transient store failure; the operation may succeed if retried later.
  Unavailable,
  Internal,
}

impl ErrorKind {
  /// Whether a caller may reasonably retry the failed operation.
  pub fn is_retryable(self) -> bool { matches!(self, Self::Unavailable) }
}

/// Implemented by every error type that can escape a [`DirectoryStore`].
///
/// [`DirectoryStore`]: crate::store::DirectoryStore
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Validation(_) | Error::SelfConnection => ErrorKind::Validation,
      Error::CompanyNotFound(_) | Error::ConnectionNotFound(_) => {
        ErrorKind::NotFound
      }
      Error::DuplicateRequest { .. } => ErrorKind::Duplicate,
      Error::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Error::NotReceiver(_) => ErrorKind::Forbidden,
    }
  }
}
