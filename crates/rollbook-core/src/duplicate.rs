//! Duplicate detection for attendance keys.
//!
//! The store lookup here is a pre-flight check only: a concurrent writer can
//! insert the same key between the check and the insert. The store's unique
//! constraint is what actually holds the invariant.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
  Error, Result,
  error::{Conflict, ConflictSource},
  record::{AttendanceKey, NewAttendance},
  store::{AttendanceFilter, AttendanceStore, PageRequest},
};

/// Outcome of a single guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
  Clear,
  Conflict { record_id: Uuid },
}

/// Look up whether `key` already has a stored record.
pub async fn check<S: AttendanceStore>(store: &S, key: &AttendanceKey) -> Result<Clearance> {
  let filter = AttendanceFilter {
    student_id: Some(key.student_id),
    subject_id: Some(key.subject_id),
    date: Some(key.date),
    ..Default::default()
  };

  let page = store
    .query(&filter, PageRequest::new(1, 1))
    .await
    .map_err(Error::from_store)?;

  Ok(match page.records.first() {
    Some(existing) => Clearance::Conflict { record_id: existing.id },
    None => Clearance::Clear,
  })
}

/// Check every record of a batch against the store.
///
/// Returns one [`Conflict`] per colliding record, in batch order.
pub async fn stored_conflicts<S: AttendanceStore>(
  store: &S,
  records: &[NewAttendance],
) -> Result<Vec<Conflict>> {
  let mut conflicts = Vec::new();
  for (index, record) in records.iter().enumerate() {
    let key = record.key();
    if let Clearance::Conflict { record_id } = check(store, &key).await? {
      conflicts.push(Conflict {
        key,
        index: Some(index),
        source: ConflictSource::Stored { record_id: Some(record_id) },
      });
    }
  }
  Ok(conflicts)
}

/// Find keys that occur more than once inside `records`. Every repeat after
/// the first occurrence is reported.
pub fn batch_conflicts(records: &[NewAttendance]) -> Vec<Conflict> {
  let mut first_seen: HashMap<AttendanceKey, usize> = HashMap::new();
  let mut conflicts = Vec::new();

  for (index, record) in records.iter().enumerate() {
    let key = record.key();
    match first_seen.get(&key) {
      Some(&first_index) => conflicts.push(Conflict {
        key,
        index: Some(index),
        source: ConflictSource::Batch { first_index },
      }),
      None => {
        first_seen.insert(key, index);
      }
    }
  }

  conflicts
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::record::AttendanceStatus;

  #[test]
  fn batch_conflicts_reports_repeats_with_first_index() {
    let student = Uuid::new_v4();
    let subject = Uuid::new_v4();
    let day = |d| NaiveDate::from_ymd_opt(2024, 9, d).unwrap();

    let records = vec![
      NewAttendance::new(student, subject, day(2), AttendanceStatus::Present),
      NewAttendance::new(student, subject, day(3), AttendanceStatus::Present),
      NewAttendance::new(student, subject, day(2), AttendanceStatus::Absent),
      NewAttendance::new(student, subject, day(2), AttendanceStatus::Late),
    ];

    let conflicts = batch_conflicts(&records);
    assert_eq!(conflicts.len(), 2);
    assert_eq!(conflicts[0].index, Some(2));
    assert_eq!(conflicts[0].source, ConflictSource::Batch { first_index: 0 });
    assert_eq!(conflicts[1].index, Some(3));
    assert_eq!(conflicts[1].source, ConflictSource::Batch { first_index: 0 });
  }

  #[test]
  fn batch_conflicts_empty_for_distinct_keys() {
    let subject = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let records: Vec<_> = (0..3)
      .map(|_| NewAttendance::new(Uuid::new_v4(), subject, date, AttendanceStatus::Present))
      .collect();
    assert!(batch_conflicts(&records).is_empty());
  }
}
