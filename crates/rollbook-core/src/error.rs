//! Error types for `rollbook-core`.
//!
//! Every variant except [`Error::Infrastructure`] is an expected outcome the
//! caller is required to handle.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  record::AttendanceKey,
  store::{StoreError, StoreErrorKind},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationError),

  #[error("{} attendance record(s) conflict with existing entries", .0.len())]
  DuplicateConflict(Vec<Conflict>),

  #[error("a referenced student or subject no longer exists")]
  ReferentialViolation,

  #[error(
    "bulk import stopped at chunk {failed_chunk} after committing {committed} record(s): {cause}"
  )]
  PartialBatchFailure {
    committed:     usize,
    committed_ids: Vec<Uuid>,
    failed_chunk:  usize,
    cause:         Box<Error>,
  },

  #[error("{0} not found")]
  NotFound(Target),

  #[error("store error: {0}")]
  Infrastructure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Map a backend error onto the core taxonomy.
  ///
  /// A uniqueness violation becomes a [`Error::DuplicateConflict`] with no
  /// conflicts listed; callers that know the offending keys should fill them
  /// in.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.kind() {
      StoreErrorKind::DuplicateKey => Error::DuplicateConflict(Vec::new()),
      StoreErrorKind::ReferentialViolation => Error::ReferentialViolation,
      StoreErrorKind::Other => Error::Infrastructure(Box::new(err)),
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::ReferentialViolation)
  }
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self { Error::Validation(e) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation ──────────────────────────────────────────────────────────────

/// The candidate field a validation failure is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  StudentId,
  SubjectId,
  Date,
  Status,
  /// The submission as a whole, e.g. an empty batch.
  Batch,
  /// A request body that could not be decoded into candidates at all.
  Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum ValidationReason {
  #[error("is required")]
  Missing,
  #[error("is malformed: {0:?}")]
  Malformed(String),
  #[error("{0:?} is not one of present, absent, late, excused")]
  InvalidStatus(String),
  #[error("does not match any student")]
  UnknownStudent,
  #[error("does not match any subject")]
  UnknownSubject,
  #[error("contains no records")]
  Empty,
}

/// A structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
  /// Zero-based position of the offending candidate inside a batch.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub index:  Option<usize>,
  pub field:  Field,
  #[serde(flatten)]
  pub reason: ValidationReason,
}

impl ValidationError {
  pub fn new(field: Field, reason: ValidationReason) -> Self {
    Self { index: None, field, reason }
  }

  pub fn at(mut self, index: usize) -> Self {
    self.index = Some(index);
    self
  }
}

impl std::fmt::Display for ValidationError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(i) = self.index {
      write!(f, "record {i}: ")?;
    }
    write!(f, "{} {}", self.field, self.reason)
  }
}

impl std::error::Error for ValidationError {}

// ─── Conflicts ───────────────────────────────────────────────────────────────

/// Where the colliding entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ConflictSource {
  /// Already persisted. `record_id` is unknown when the conflict was reported
  /// by the store's constraint rather than found by the guard.
  Stored { record_id: Option<Uuid> },
  /// Repeats an earlier candidate of the same batch.
  Batch { first_index: usize },
}

/// One key that cannot be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
  pub key:    AttendanceKey,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub index:  Option<usize>,
  #[serde(flatten)]
  pub source: ConflictSource,
}

// ─── Not found ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
  Record(Uuid),
  Student(Uuid),
  Subject(Uuid),
}

impl std::fmt::Display for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Target::Record(id) => write!(f, "attendance record {id}"),
      Target::Student(id) => write!(f, "student {id}"),
      Target::Subject(id) => write!(f, "subject {id}"),
    }
  }
}
