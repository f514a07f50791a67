//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `rollbook-store-sqlite`).
//! The validator, duplicate guard, import processor and aggregator depend on
//! this abstraction only; the store is always passed in, never global.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  record::{AttendancePatch, AttendanceRecord, AttendanceStatus, NewAttendance},
  roster::{Student, Subject},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`AttendanceStore::query`]. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
  pub student_id: Option<Uuid>,
  pub subject_id: Option<Uuid>,
  pub date:       Option<NaiveDate>,
  /// Inclusive lower bound on `date`.
  pub start_date: Option<NaiveDate>,
  /// Inclusive upper bound on `date`.
  pub end_date:   Option<NaiveDate>,
  pub status:     Option<AttendanceStatus>,
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl PageRequest {
  pub fn new(page: u32, limit: u32) -> Self {
    Self { page: page.max(1), limit: limit.max(1) }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

impl Default for PageRequest {
  fn default() -> Self { Self::new(1, 10) }
}

/// One page of query results plus the unpaged match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
  pub records: Vec<AttendanceRecord>,
  pub total:   u64,
  pub page:    u32,
  pub limit:   u32,
  pub pages:   u64,
}

impl Page {
  pub fn new(records: Vec<AttendanceRecord>, total: u64, request: PageRequest) -> Self {
    Self {
      records,
      total,
      page: request.page,
      limit: request.limit,
      pages: total.div_ceil(u64::from(request.limit)),
    }
  }
}

// ─── Error classification ────────────────────────────────────────────────────

/// The failure classes callers must distinguish when a write is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  /// The `(student, subject, date)` uniqueness constraint was violated.
  DuplicateKey,
  /// A referenced student or subject no longer exists.
  ReferentialViolation,
  Other,
}

/// Implemented by backend error types so the core can map constraint failures
/// onto [`crate::Error`] without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the attendance repository.
///
/// The backend must enforce `(student_id, subject_id, date)` uniqueness
/// itself and report a violation as [`StoreErrorKind::DuplicateKey`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: StoreError;

  // ── Referential lookups ───────────────────────────────────────────────

  fn student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  fn student_exists(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move { Ok(self.student(id).await?.is_some()) }
  }

  fn subject_exists(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move { Ok(self.subject(id).await?.is_some()) }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a record by id. Returns `None` if not found.
  fn find(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Return one page of records matching `filter`, newest `date` first.
  fn query<'a>(
    &'a self,
    filter: &'a AttendanceFilter,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist one record; `id`, `created_at` and `updated_at` are assigned by
  /// the store.
  fn insert_one(
    &self,
    record: NewAttendance,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Persist several records atomically: either all are stored or none.
  fn insert_many(
    &self,
    records: Vec<NewAttendance>,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Apply `patch` and refresh `updated_at`. Returns `None` if not found.
  fn update(
    &self,
    id: Uuid,
    patch: AttendancePatch,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Delete a record. Returns `false` if it did not exist.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
