//! Error type for `bizdir-store-sqlite`.

use bizdir_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] bizdir_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Busy, locked, or timed out. Reads have already been retried.
  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("failed to write search audit record: {0}")]
  AuditWriteFailed(#[source] Box<Error>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Convert a raw database error, separating lock contention from hard
  /// failures.
  pub(crate) fn from_db(e: tokio_rusqlite::Error) -> Self {
    use rusqlite::ErrorCode;

    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _)) = &e
      && matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    {
      return Error::Unavailable(e.to_string());
    }
    Error::Database(e)
  }

  pub fn is_transient(&self) -> bool { matches!(self, Error::Unavailable(_)) }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Unavailable(_) => ErrorKind::Unavailable,
      Error::Database(_)
      | Error::Uuid(_)
      | Error::Decode(_)
      | Error::AuditWriteFailed(_) => ErrorKind::Internal,
    }
  }
}
