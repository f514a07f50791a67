//! Bulk import of attendance records.
//!
//! A batch goes through three phases:
//!
//! 1. **Validate** every candidate. The first failure rejects the batch.
//! 2. **Detect duplicates** against the store (and, when enabled, inside the
//!    batch). Any conflict rejects the batch with the full conflict list.
//! 3. **Insert** in fixed-size chunks, one [`AttendanceStore::insert_many`]
//!    call per chunk. A failed chunk stops the import; chunks already
//!    inserted stay committed and are reported through
//!    [`Error::PartialBatchFailure`].
//!
//! Nothing is written before phase 3.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  duplicate,
  error::{Conflict, ConflictSource, Field, ValidationError, ValidationReason},
  record::{AttendanceCandidate, AttendanceRecord, NewAttendance},
  store::{AttendanceStore, StoreError, StoreErrorKind},
  validate,
};

/// Records per `insert_many` call unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Tunables for [`import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
  pub chunk_size:              usize,
  /// Report keys repeated inside one batch as conflicts in phase 2. When
  /// `false`, only the store is consulted and a repeat surfaces as a failed
  /// chunk.
  pub reject_batch_duplicates: bool,
}

impl Default for ImportOptions {
  fn default() -> Self {
    Self {
      chunk_size:              DEFAULT_CHUNK_SIZE,
      reject_batch_duplicates: true,
    }
  }
}

/// A fully committed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
  pub records: Vec<AttendanceRecord>,
  pub count:   usize,
}

/// Validate, de-duplicate and insert `candidates` as one submission.
pub async fn import<S: AttendanceStore>(
  store: &S,
  candidates: &[AttendanceCandidate],
  options: ImportOptions,
) -> Result<ImportOutcome> {
  let records = validate_all(store, candidates).await?;
  tracing::debug!(count = records.len(), "bulk import: batch validated");

  let conflicts = find_conflicts(store, &records, options).await?;
  if !conflicts.is_empty() {
    tracing::debug!(
      conflicts = conflicts.len(),
      "bulk import: batch rejected for duplicates"
    );
    return Err(Error::DuplicateConflict(conflicts));
  }

  insert_chunked(store, records, options.chunk_size).await
}

/// Phase 1. Candidates are checked in order so the error names the first
/// offending entry.
async fn validate_all<S: AttendanceStore>(
  store: &S,
  candidates: &[AttendanceCandidate],
) -> Result<Vec<NewAttendance>> {
  if candidates.is_empty() {
    return Err(ValidationError::new(Field::Batch, ValidationReason::Empty).into());
  }

  let mut records = Vec::with_capacity(candidates.len());
  for (index, candidate) in candidates.iter().enumerate() {
    match validate::validate(store, candidate).await {
      Ok(record) => records.push(record),
      Err(Error::Validation(e)) => return Err(Error::Validation(e.at(index))),
      Err(other) => return Err(other),
    }
  }
  Ok(records)
}

/// Phase 2.
async fn find_conflicts<S: AttendanceStore>(
  store: &S,
  records: &[NewAttendance],
  options: ImportOptions,
) -> Result<Vec<Conflict>> {
  let mut conflicts = duplicate::stored_conflicts(store, records).await?;
  if options.reject_batch_duplicates {
    conflicts.extend(duplicate::batch_conflicts(records));
    conflicts.sort_by_key(|c| c.index);
  }
  Ok(conflicts)
}

/// Phase 3.
async fn insert_chunked<S: AttendanceStore>(
  store: &S,
  records: Vec<NewAttendance>,
  chunk_size: usize,
) -> Result<ImportOutcome> {
  let chunk_size = chunk_size.max(1);
  let mut inserted: Vec<AttendanceRecord> = Vec::with_capacity(records.len());

  for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
    match store.insert_many(chunk.to_vec()).await {
      Ok(stored) => {
        tracing::debug!(
          chunk = chunk_index,
          size = stored.len(),
          "bulk import: chunk committed"
        );
        inserted.extend(stored);
      }
      Err(e) => {
        let cause = chunk_failure(store, chunk, chunk_index * chunk_size, e).await;
        let committed_ids: Vec<Uuid> = inserted.iter().map(|r| r.id).collect();
        tracing::warn!(
          chunk = chunk_index,
          committed = committed_ids.len(),
          error = %cause,
          "bulk import: chunk failed, earlier chunks remain committed"
        );
        return Err(Error::PartialBatchFailure {
          committed: committed_ids.len(),
          committed_ids,
          failed_chunk: chunk_index,
          cause: Box::new(cause),
        });
      }
    }
  }

  let count = inserted.len();
  Ok(ImportOutcome { records: inserted, count })
}

/// Turn a chunk's store error into a core error. For a uniqueness violation
/// the offending keys are recovered: repeats inside the chunk, plus keys that
/// now exist in the store (written concurrently since phase 2).
async fn chunk_failure<S: AttendanceStore>(
  store: &S,
  chunk: &[NewAttendance],
  offset: usize,
  err: S::Error,
) -> Error {
  if err.kind() != StoreErrorKind::DuplicateKey {
    return Error::from_store(err);
  }

  let mut conflicts = duplicate::batch_conflicts(chunk);
  match duplicate::stored_conflicts(store, chunk).await {
    Ok(stored) => conflicts.extend(stored),
    Err(lookup) => {
      tracing::warn!(error = %lookup, "bulk import: could not resolve conflicting keys");
    }
  }

  for conflict in &mut conflicts {
    conflict.index = conflict.index.map(|i| i + offset);
    if let ConflictSource::Batch { first_index } = &mut conflict.source {
      *first_index += offset;
    }
  }
  conflicts.sort_by_key(|c| c.index);
  Error::DuplicateConflict(conflicts)
}
