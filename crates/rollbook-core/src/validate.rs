//! Record validation.
//!
//! Turns an [`AttendanceCandidate`] into a [`NewAttendance`], or explains which
//! field is wrong. Structural checks run first and touch nothing; only a
//! structurally valid candidate is resolved against the store.

use std::str::FromStr;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Error, Result,
  error::{Field, ValidationError, ValidationReason},
  record::{AttendanceCandidate, AttendanceStatus, NewAttendance},
  store::AttendanceStore,
};

/// Validate one candidate: required fields, status, well-formedness, then
/// student and subject existence.
///
/// A failed lookup (store unreachable) is returned as an infrastructure error,
/// never as a validation failure.
pub async fn validate<S: AttendanceStore>(
  store: &S,
  candidate: &AttendanceCandidate,
) -> Result<NewAttendance> {
  let record = check_fields(candidate)?;
  check_references(store, &record).await?;
  Ok(record)
}

/// The store-free part of [`validate`].
pub fn check_fields(
  candidate: &AttendanceCandidate,
) -> Result<NewAttendance, ValidationError> {
  let student_id = required(&candidate.student_id, Field::StudentId)?;
  let subject_id = required(&candidate.subject_id, Field::SubjectId)?;
  let date = required(&candidate.date, Field::Date)?;
  let status = required(&candidate.status, Field::Status)?;

  let status = parse_status(status)?;

  Ok(NewAttendance {
    student_id: parse_id(student_id, Field::StudentId)?,
    subject_id: parse_id(subject_id, Field::SubjectId)?,
    date: parse_date(date)?,
    status,
    remarks: candidate.remarks.as_deref().and_then(clean_remarks),
  })
}

/// Trimmed remarks, or `None` when nothing but whitespace was given.
pub fn clean_remarks(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Resolve the student and subject a record points at.
pub async fn check_references<S: AttendanceStore>(
  store: &S,
  record: &NewAttendance,
) -> Result<()> {
  if !store
    .student_exists(record.student_id)
    .await
    .map_err(Error::from_store)?
  {
    return Err(
      ValidationError::new(Field::StudentId, ValidationReason::UnknownStudent)
        .into(),
    );
  }

  if !store
    .subject_exists(record.subject_id)
    .await
    .map_err(Error::from_store)?
  {
    return Err(
      ValidationError::new(Field::SubjectId, ValidationReason::UnknownSubject)
        .into(),
    );
  }

  Ok(())
}

/// Parse a status string; only the lowercase enum names are accepted.
pub fn parse_status(value: &str) -> Result<AttendanceStatus, ValidationError> {
  AttendanceStatus::from_str(value).map_err(|_| {
    ValidationError::new(
      Field::Status,
      ValidationReason::InvalidStatus(value.to_owned()),
    )
  })
}

fn required(value: &Option<String>, field: Field) -> Result<&str, ValidationError> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .ok_or_else(|| ValidationError::new(field, ValidationReason::Missing))
}

fn parse_id(value: &str, field: Field) -> Result<Uuid, ValidationError> {
  Uuid::parse_str(value).map_err(|_| {
    ValidationError::new(field, ValidationReason::Malformed(value.to_owned()))
  })
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
    ValidationError::new(Field::Date, ValidationReason::Malformed(value.to_owned()))
  })
}
