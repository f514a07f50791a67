//! Attendance records, the only entity this subsystem owns.
//!
//! A record is identified by its UUID but is *unique* by its
//! [`AttendanceKey`]: one entry per student, per subject, per class day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// How a student attended one class session.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
  Present,
  Absent,
  /// Counts as attended for percentages, but is tallied separately.
  Late,
  /// A sanctioned absence; removed from both sides of the percentage.
  Excused,
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The `(student, subject, date)` tuple that must be unique across stored
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceKey {
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub date:       NaiveDate,
}

impl std::fmt::Display for AttendanceKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "({}, {}, {})", self.student_id, self.subject_id, self.date)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored attendance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id:         Uuid,
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub date:       NaiveDate,
  pub status:     AttendanceStatus,
  pub remarks:    Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
  pub fn key(&self) -> AttendanceKey {
    AttendanceKey {
      student_id: self.student_id,
      subject_id: self.subject_id,
      date:       self.date,
    }
  }
}

/// A validated record ready to be inserted. The store assigns `id` and the
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttendance {
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub date:       NaiveDate,
  pub status:     AttendanceStatus,
  pub remarks:    Option<String>,
}

impl NewAttendance {
  pub fn new(
    student_id: Uuid,
    subject_id: Uuid,
    date: NaiveDate,
    status: AttendanceStatus,
  ) -> Self {
    Self { student_id, subject_id, date, status, remarks: None }
  }

  pub fn key(&self) -> AttendanceKey {
    AttendanceKey {
      student_id: self.student_id,
      subject_id: self.subject_id,
      date:       self.date,
    }
  }
}

/// An unvalidated entry exactly as a caller submitted it.
///
/// Every field is optional text so that missing and malformed input can be
/// reported per field by [`crate::validate`] instead of failing wholesale at
/// deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCandidate {
  pub student_id: Option<String>,
  pub subject_id: Option<String>,
  pub date:       Option<String>,
  pub status:     Option<String>,
  pub remarks:    Option<String>,
}

impl From<NewAttendance> for AttendanceCandidate {
  fn from(n: NewAttendance) -> Self {
    Self {
      student_id: Some(n.student_id.to_string()),
      subject_id: Some(n.subject_id.to_string()),
      date:       Some(n.date.to_string()),
      status:     Some(n.status.to_string()),
      remarks:    n.remarks,
    }
  }
}

/// The mutable subset of a record. Identity fields (`student_id`,
/// `subject_id`, `date`) cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePatch {
  pub status:  Option<AttendanceStatus>,
  /// `None` leaves remarks alone; `Some(None)` clears them.
  pub remarks: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn status_parses_lowercase_only() {
    assert_eq!(
      AttendanceStatus::from_str("late").unwrap(),
      AttendanceStatus::Late
    );
    assert!(AttendanceStatus::from_str("Late").is_err());
    assert!(AttendanceStatus::from_str("tardy").is_err());
  }

  #[test]
  fn status_display_matches_serde() {
    for status in AttendanceStatus::iter() {
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{status}\""));
    }
  }
}
