//! In-memory [`AttendanceStore`] used by the core tests.
//!
//! Enforces the same uniqueness and referential constraints as a real backend
//! and can be told to fail on demand.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  record::{AttendancePatch, AttendanceRecord, NewAttendance},
  roster::{Student, Subject},
  store::{AttendanceFilter, AttendanceStore, Page, PageRequest, StoreError, StoreErrorKind},
};

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
  #[error("unique constraint failed")]
  DuplicateKey,
  #[error("foreign key constraint failed")]
  MissingReference,
  #[error("store unavailable")]
  Unavailable,
}

impl StoreError for MemoryError {
  fn kind(&self) -> StoreErrorKind {
    match self {
      MemoryError::DuplicateKey => StoreErrorKind::DuplicateKey,
      MemoryError::MissingReference => StoreErrorKind::ReferentialViolation,
      MemoryError::Unavailable => StoreErrorKind::Other,
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  students:          Mutex<HashMap<Uuid, Student>>,
  subjects:          Mutex<HashMap<Uuid, Subject>>,
  records:           Mutex<Vec<AttendanceRecord>>,
  /// Number of `insert_many` calls so far.
  insert_many_calls: AtomicUsize,
  /// Fail the `insert_many` call with this zero-based ordinal.
  fail_insert_many:  Mutex<Option<usize>>,
  unavailable:       AtomicBool,
  /// Make `query` see nothing, as if every matching row was written after
  /// the read.
  blind_queries:     AtomicBool,
}

impl MemoryStore {
  pub fn add_student(&self, name: &str) -> Student {
    let student = Student { id: Uuid::new_v4(), name: name.into(), course_id: None };
    self.students.lock().unwrap().insert(student.id, student.clone());
    student
  }

  pub fn add_subject(&self, name: &str, code: &str) -> Subject {
    let subject = Subject {
      id:        Uuid::new_v4(),
      name:      name.into(),
      code:      code.into(),
      course_id: None,
    };
    self.subjects.lock().unwrap().insert(subject.id, subject.clone());
    subject
  }

  pub fn remove_student(&self, id: Uuid) { self.students.lock().unwrap().remove(&id); }

  pub fn fail_insert_many_call(&self, ordinal: usize) {
    *self.fail_insert_many.lock().unwrap() = Some(ordinal);
  }

  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn set_blind_queries(&self, blind: bool) {
    self.blind_queries.store(blind, Ordering::SeqCst);
  }

  pub fn insert_many_calls(&self) -> usize { self.insert_many_calls.load(Ordering::SeqCst) }

  pub fn len(&self) -> usize { self.records.lock().unwrap().len() }

  /// Insert a record bypassing every check except the constraints.
  pub fn seed(&self, input: NewAttendance) -> AttendanceRecord {
    let mut records = self.records.lock().unwrap();
    self.insert_locked(&mut records, input).unwrap()
  }

  fn available(&self) -> Result<(), MemoryError> {
    if self.unavailable.load(Ordering::SeqCst) {
      Err(MemoryError::Unavailable)
    } else {
      Ok(())
    }
  }

  fn insert_locked(
    &self,
    records: &mut Vec<AttendanceRecord>,
    input: NewAttendance,
  ) -> Result<AttendanceRecord, MemoryError> {
    if !self.students.lock().unwrap().contains_key(&input.student_id)
      || !self.subjects.lock().unwrap().contains_key(&input.subject_id)
    {
      return Err(MemoryError::MissingReference);
    }
    if records.iter().any(|r| r.key() == input.key()) {
      return Err(MemoryError::DuplicateKey);
    }
    let now = Utc::now();
    let record = AttendanceRecord {
      id:         Uuid::new_v4(),
      student_id: input.student_id,
      subject_id: input.subject_id,
      date:       input.date,
      status:     input.status,
      remarks:    input.remarks,
      created_at: now,
      updated_at: now,
    };
    records.push(record.clone());
    Ok(record)
  }
}

fn matches(filter: &AttendanceFilter, r: &AttendanceRecord) -> bool {
  filter.student_id.is_none_or(|id| r.student_id == id)
    && filter.subject_id.is_none_or(|id| r.subject_id == id)
    && filter.date.is_none_or(|d| r.date == d)
    && filter.start_date.is_none_or(|d| r.date >= d)
    && filter.end_date.is_none_or(|d| r.date <= d)
    && filter.status.is_none_or(|s| r.status == s)
}

impl AttendanceStore for MemoryStore {
  type Error = MemoryError;

  async fn student(&self, id: Uuid) -> Result<Option<Student>, MemoryError> {
    self.available()?;
    Ok(self.students.lock().unwrap().get(&id).cloned())
  }

  async fn subject(&self, id: Uuid) -> Result<Option<Subject>, MemoryError> {
    self.available()?;
    Ok(self.subjects.lock().unwrap().get(&id).cloned())
  }

  async fn find(&self, id: Uuid) -> Result<Option<AttendanceRecord>, MemoryError> {
    self.available()?;
    Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
  }

  async fn query(
    &self,
    filter: &AttendanceFilter,
    page: PageRequest,
  ) -> Result<Page, MemoryError> {
    self.available()?;
    if self.blind_queries.load(Ordering::SeqCst) {
      return Ok(Page::new(Vec::new(), 0, page));
    }
    let mut hits: Vec<AttendanceRecord> = self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|r| matches(filter, r))
      .cloned()
      .collect();
    hits.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    let total = hits.len() as u64;
    let records = hits
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit as usize)
      .collect();
    Ok(Page::new(records, total, page))
  }

  async fn insert_one(&self, record: NewAttendance) -> Result<AttendanceRecord, MemoryError> {
    self.available()?;
    let mut records = self.records.lock().unwrap();
    self.insert_locked(&mut records, record)
  }

  async fn insert_many(
    &self,
    input: Vec<NewAttendance>,
  ) -> Result<Vec<AttendanceRecord>, MemoryError> {
    self.available()?;
    let call = self.insert_many_calls.fetch_add(1, Ordering::SeqCst);
    if *self.fail_insert_many.lock().unwrap() == Some(call) {
      return Err(MemoryError::Unavailable);
    }

    // All or nothing: work on a copy and swap it in on success.
    let mut records = self.records.lock().unwrap();
    let mut staged = records.clone();
    let mut inserted = Vec::with_capacity(input.len());
    for record in input {
      inserted.push(self.insert_locked(&mut staged, record)?);
    }
    *records = staged;
    Ok(inserted)
  }

  async fn update(
    &self,
    id: Uuid,
    patch: AttendancePatch,
  ) -> Result<Option<AttendanceRecord>, MemoryError> {
    self.available()?;
    let mut records = self.records.lock().unwrap();
    let Some(record) = records.iter_mut().find(|r| r.id == id) else {
      return Ok(None);
    };
    if let Some(status) = patch.status {
      record.status = status;
    }
    if let Some(remarks) = patch.remarks {
      record.remarks = remarks;
    }
    record.updated_at = Utc::now();
    Ok(Some(record.clone()))
  }

  async fn delete(&self, id: Uuid) -> Result<bool, MemoryError> {
    self.available()?;
    let mut records = self.records.lock().unwrap();
    let before = records.len();
    records.retain(|r| r.id != id);
    Ok(records.len() != before)
  }
}
