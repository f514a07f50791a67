//! Error type for `rollbook-store-sqlite`.

use rollbook_core::store::{StoreError, StoreErrorKind};
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// The `(student_id, subject_id, date)` unique constraint rejected a write.
  #[error("attendance key already exists: {0}")]
  DuplicateKey(String),

  /// A foreign key to `students` or `subjects` did not resolve, or a
  /// referenced row is still in use.
  #[error("foreign key constraint failed: {0}")]
  ReferentialViolation(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown attendance status: {0:?}")]
  UnknownStatus(String),
}

/// Constraint failures are classified by their SQLite extended result code so
/// the core can tell a duplicate from a dangling reference.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, msg)) = &e {
      let msg = msg.clone().unwrap_or_default();
      match code.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
          return Error::DuplicateKey(msg);
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Error::ReferentialViolation(msg),
        _ => {}
      }
    }
    Error::Database(e)
  }
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Error::DuplicateKey(_) => StoreErrorKind::DuplicateKey,
      Error::ReferentialViolation(_) => StoreErrorKind::ReferentialViolation,
      _ => StoreErrorKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
