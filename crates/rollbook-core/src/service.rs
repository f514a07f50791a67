//! [`AttendanceService`]: the operations exposed to the API layer.
//!
//! Each operation runs to completion on its own; the only shared state is the
//! injected store handle.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  duplicate::{self, Clearance},
  error::{Conflict, ConflictSource, Target},
  import::{self, ImportOptions, ImportOutcome},
  record::{AttendanceCandidate, AttendancePatch, AttendanceRecord},
  store::{AttendanceFilter, AttendanceStore, Page, PageRequest},
  summary::{self, DateWindow, StudentReport, SubjectReport},
  validate,
};

pub struct AttendanceService<S> {
  store:   Arc<S>,
  options: ImportOptions,
}

impl<S> Clone for AttendanceService<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), options: self.options }
  }
}

impl<S: AttendanceStore> AttendanceService<S> {
  pub fn new(store: Arc<S>, options: ImportOptions) -> Self { Self { store, options } }

  pub fn store(&self) -> &S { &self.store }

  pub fn options(&self) -> ImportOptions { self.options }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn list(&self, filter: &AttendanceFilter, page: PageRequest) -> Result<Page> {
    self.store.query(filter, page).await.map_err(Error::from_store)
  }

  pub async fn get(&self, id: Uuid) -> Result<AttendanceRecord> {
    self
      .store
      .find(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::NotFound(Target::Record(id)))
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate, guard, then insert one record.
  ///
  /// A uniqueness violation raised by the store (a concurrent insert that
  /// slipped past the guard) is reported exactly like a guard hit.
  pub async fn create(&self, candidate: &AttendanceCandidate) -> Result<AttendanceRecord> {
    let record = validate::validate(&*self.store, candidate).await?;
    let key = record.key();

    if let Clearance::Conflict { record_id } = duplicate::check(&*self.store, &key).await? {
      return Err(Error::DuplicateConflict(vec![Conflict {
        key,
        index: None,
        source: ConflictSource::Stored { record_id: Some(record_id) },
      }]));
    }

    self
      .store
      .insert_one(record)
      .await
      .map_err(|e| match Error::from_store(e) {
        Error::DuplicateConflict(_) => Error::DuplicateConflict(vec![Conflict {
          key,
          index: None,
          source: ConflictSource::Stored { record_id: None },
        }]),
        other => other,
      })
  }

  /// Change `status` and/or `remarks`; identity fields are never touched.
  ///
  /// Remarks are cleaned as on create, so blank remarks clear the field.
  pub async fn update(&self, id: Uuid, mut patch: AttendancePatch) -> Result<AttendanceRecord> {
    patch.remarks = patch
      .remarks
      .map(|remarks| remarks.as_deref().and_then(validate::clean_remarks));
    self
      .store
      .update(id, patch)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::NotFound(Target::Record(id)))
  }

  pub async fn delete(&self, id: Uuid) -> Result<()> {
    if self.store.delete(id).await.map_err(Error::from_store)? {
      Ok(())
    } else {
      Err(Error::NotFound(Target::Record(id)))
    }
  }

  pub async fn bulk_create(&self, candidates: &[AttendanceCandidate]) -> Result<ImportOutcome> {
    import::import(&*self.store, candidates, self.options).await
  }

  // ── Reports ───────────────────────────────────────────────────────────

  pub async fn student_report(
    &self,
    student_id: Uuid,
    subject_id: Option<Uuid>,
    window: DateWindow,
  ) -> Result<StudentReport> {
    summary::student_report(&*self.store, student_id, subject_id, window).await
  }

  pub async fn subject_report(&self, subject_id: Uuid, window: DateWindow) -> Result<SubjectReport> {
    summary::subject_report(&*self.store, subject_id, window).await
  }
}
