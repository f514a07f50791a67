//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`, so
//! lexical order matches chronological order. UUIDs are stored as hyphenated
//! lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rollbook_core::{
  record::{AttendanceRecord, AttendanceStatus},
  roster::{Student, Subject},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AttendanceStatus ────────────────────────────────────────────────────────

pub fn encode_status(s: AttendanceStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<AttendanceStatus> {
  AttendanceStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "attendance_id, student_id, subject_id, date, status, \
                                  remarks, created_at, updated_at";

/// Raw strings read directly from an `attendance` row.
pub struct RawRecord {
  pub attendance_id: String,
  pub student_id:    String,
  pub subject_id:    String,
  pub date:          String,
  pub status:        String,
  pub remarks:       Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attendance_id: row.get(0)?,
      student_id:    row.get(1)?,
      subject_id:    row.get(2)?,
      date:          row.get(3)?,
      status:        row.get(4)?,
      remarks:       row.get(5)?,
      created_at:    row.get(6)?,
      updated_at:    row.get(7)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      id:         decode_uuid(&self.attendance_id)?,
      student_id: decode_uuid(&self.student_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      date:       decode_date(&self.date)?,
      status:     decode_status(&self.status)?,
      remarks:    self.remarks,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_id: String,
  pub name:       String,
  pub course_id:  Option<String>,
}

impl RawStudent {
  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:        decode_uuid(&self.student_id)?,
      name:      self.name,
      course_id: self.course_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub name:       String,
  pub code:       String,
  pub course_id:  Option<String>,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:        decode_uuid(&self.subject_id)?,
      name:      self.name,
      code:      self.code,
      course_id: self.course_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}
