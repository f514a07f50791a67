//! Attendance statistics.
//!
//! Percentages treat `late` as attended and drop `excused` from both sides:
//!
//! ```text
//! percentage = round((present + late) / (total - excused) * 100)
//! ```
//!
//! which is `0` when every record is excused.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  error::Target,
  record::{AttendanceRecord, AttendanceStatus},
  roster::{Student, Subject},
  store::{AttendanceFilter, AttendanceStore, PageRequest},
};

/// Page size used when draining the store for a report.
const FETCH_PAGE_SIZE: u32 = 500;

// ─── Tally ───────────────────────────────────────────────────────────────────

/// Per-status counts for one group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
  pub total:      u64,
  pub present:    u64,
  pub absent:     u64,
  pub late:       u64,
  pub excused:    u64,
  pub percentage: u32,
}

impl Tally {
  pub fn from_statuses(statuses: impl IntoIterator<Item = AttendanceStatus>) -> Self {
    let mut tally = Self::default();
    for status in statuses {
      tally.count(status);
    }
    tally
  }

  fn count(&mut self, status: AttendanceStatus) {
    self.total += 1;
    match status {
      AttendanceStatus::Present => self.present += 1,
      AttendanceStatus::Absent => self.absent += 1,
      AttendanceStatus::Late => self.late += 1,
      AttendanceStatus::Excused => self.excused += 1,
    }
    self.percentage = percentage(self.present + self.late, self.total - self.excused);
  }

  /// Whether this group has at least one class that is not excused.
  pub fn is_countable(&self) -> bool { self.total > self.excused }
}

/// `round(attended / countable * 100)`, or `0` with nothing countable.
pub fn percentage(attended: u64, countable: u64) -> u32 {
  if countable == 0 {
    return 0;
  }
  (attended as f64 / countable as f64 * 100.0).round() as u32
}

/// Mean percentage over countable tallies only. A student whose records are
/// all excused is left out rather than averaged in as `0`.
pub fn average_percentage<'a>(tallies: impl IntoIterator<Item = &'a Tally>) -> f64 {
  let (sum, n) = tallies
    .into_iter()
    .filter(|t| t.is_countable())
    .fold((0u64, 0u64), |(sum, n), t| (sum + u64::from(t.percentage), n + 1));
  if n == 0 { 0.0 } else { sum as f64 / n as f64 }
}

fn group_by<F>(records: &[AttendanceRecord], key: F) -> BTreeMap<Uuid, Tally>
where
  F: Fn(&AttendanceRecord) -> Uuid,
{
  let mut groups: BTreeMap<Uuid, Tally> = BTreeMap::new();
  for record in records {
    groups.entry(key(record)).or_default().count(record.status);
  }
  groups
}

// ─── Date window ─────────────────────────────────────────────────────────────

/// Optional date restriction for a report: one day, or an inclusive range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
  pub date:       Option<NaiveDate>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

impl DateWindow {
  fn apply(self, filter: &mut AttendanceFilter) {
    filter.date = self.date;
    filter.start_date = self.start_date;
    filter.end_date = self.end_date;
  }
}

// ─── Per student ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTally {
  pub subject_id:   Uuid,
  /// `None` if the subject no longer resolves.
  pub subject_name: Option<String>,
  pub subject_code: Option<String>,
  #[serde(flatten)]
  pub tally:        Tally,
}

/// One student's attendance, broken down by subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
  pub student:  Student,
  pub subjects: Vec<SubjectTally>,
}

/// Summarise a student's records, optionally for one subject and/or a date
/// window.
pub async fn student_report<S: AttendanceStore>(
  store: &S,
  student_id: Uuid,
  subject_id: Option<Uuid>,
  window: DateWindow,
) -> Result<StudentReport> {
  let student = store
    .student(student_id)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::NotFound(Target::Student(student_id)))?;

  let mut filter = AttendanceFilter {
    student_id: Some(student_id),
    subject_id,
    ..Default::default()
  };
  window.apply(&mut filter);
  let records = fetch_all(store, &filter).await?;

  let mut subjects = Vec::new();
  for (subject_id, tally) in group_by(&records, |r| r.subject_id) {
    let subject = store.subject(subject_id).await.map_err(Error::from_store)?;
    subjects.push(SubjectTally {
      subject_id,
      subject_name: subject.as_ref().map(|s| s.name.clone()),
      subject_code: subject.map(|s| s.code),
      tally,
    });
  }
  subjects.sort_by(|a, b| {
    (&a.subject_code, a.subject_id).cmp(&(&b.subject_code, b.subject_id))
  });

  Ok(StudentReport { student, subjects })
}

// ─── Per subject ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTally {
  pub student_id:   Uuid,
  /// `None` if the student no longer resolves.
  pub student_name: Option<String>,
  #[serde(flatten)]
  pub tally:        Tally,
}

/// Totals across every student of a subject report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Overall {
  pub total_students:     u64,
  pub total_records:      u64,
  pub present:            u64,
  pub absent:             u64,
  pub late:               u64,
  pub excused:            u64,
  pub average_percentage: f64,
}

impl Overall {
  pub fn from_tallies<'a>(tallies: impl IntoIterator<Item = &'a Tally> + Clone) -> Self {
    let mut overall = tallies.clone().into_iter().fold(Self::default(), |mut o, t| {
      o.total_students += 1;
      o.total_records += t.total;
      o.present += t.present;
      o.absent += t.absent;
      o.late += t.late;
      o.excused += t.excused;
      o
    });
    overall.average_percentage = average_percentage(tallies);
    overall
  }
}

/// A subject's attendance, broken down by student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectReport {
  pub subject:  Subject,
  pub students: Vec<StudentTally>,
  pub overall:  Overall,
}

/// Summarise a subject's records, optionally for one day or a date range.
pub async fn subject_report<S: AttendanceStore>(
  store: &S,
  subject_id: Uuid,
  window: DateWindow,
) -> Result<SubjectReport> {
  let subject = store
    .subject(subject_id)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::NotFound(Target::Subject(subject_id)))?;

  let mut filter = AttendanceFilter { subject_id: Some(subject_id), ..Default::default() };
  window.apply(&mut filter);
  let records = fetch_all(store, &filter).await?;

  let mut students = Vec::new();
  for (student_id, tally) in group_by(&records, |r| r.student_id) {
    let student = store.student(student_id).await.map_err(Error::from_store)?;
    students.push(StudentTally {
      student_id,
      student_name: student.map(|s| s.name),
      tally,
    });
  }
  students.sort_by(|a, b| {
    (&a.student_name, a.student_id).cmp(&(&b.student_name, b.student_id))
  });

  let overall = Overall::from_tallies(students.iter().map(|s| &s.tally));
  Ok(SubjectReport { subject, students, overall })
}

async fn fetch_all<S: AttendanceStore>(
  store: &S,
  filter: &AttendanceFilter,
) -> Result<Vec<AttendanceRecord>> {
  let mut records = Vec::new();
  let mut page = 1;
  loop {
    let batch = store
      .query(filter, PageRequest::new(page, FETCH_PAGE_SIZE))
      .await
      .map_err(Error::from_store)?;
    let exhausted = batch.records.is_empty() || u64::from(page) >= batch.pages;
    records.extend(batch.records);
    if exhausted {
      return Ok(records);
    }
    page += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use AttendanceStatus::*;

  fn tally(present: u64, absent: u64, late: u64, excused: u64) -> Tally {
    let statuses = std::iter::repeat_n(Present, present as usize)
      .chain(std::iter::repeat_n(Absent, absent as usize))
      .chain(std::iter::repeat_n(Late, late as usize))
      .chain(std::iter::repeat_n(Excused, excused as usize));
    Tally::from_statuses(statuses)
  }

  #[test]
  fn excused_leaves_the_denominator() {
    let t = tally(6, 0, 2, 2);
    assert_eq!(t.total, 10);
    assert_eq!(t.percentage, 100);
  }

  #[test]
  fn all_excused_is_zero() {
    let t = tally(0, 0, 0, 5);
    assert_eq!(t.total, 5);
    assert_eq!(t.percentage, 0);
    assert!(!t.is_countable());
  }

  #[test]
  fn late_counts_as_attended() {
    assert_eq!(tally(1, 2, 1, 0).percentage, 50);
  }

  #[test]
  fn percentage_rounds_half_up() {
    // 1/8 = 12.5%
    assert_eq!(percentage(1, 8), 13);
    // 2/3 = 66.67%
    assert_eq!(percentage(2, 3), 67);
    assert_eq!(percentage(0, 0), 0);
  }

  #[test]
  fn average_skips_fully_excused_students() {
    let only_excused = tally(0, 0, 0, 4);
    let mostly_present = tally(3, 1, 0, 0);
    assert_eq!(mostly_present.percentage, 75);

    let avg = average_percentage([&only_excused, &mostly_present]);
    assert_eq!(avg, 75.0);
  }

  #[test]
  fn average_of_nothing_is_zero() {
    assert_eq!(average_percentage(std::iter::empty()), 0.0);
  }

  #[test]
  fn overall_sums_every_student_but_averages_countable_ones() {
    let tallies = [tally(0, 0, 0, 4), tally(3, 1, 0, 0), tally(1, 1, 0, 2)];
    let overall = Overall::from_tallies(tallies.iter());

    assert_eq!(overall.total_students, 3);
    assert_eq!(overall.total_records, 12);
    assert_eq!(overall.present, 4);
    assert_eq!(overall.absent, 2);
    assert_eq!(overall.excused, 6);
    // (75 + 50) / 2
    assert_eq!(overall.average_percentage, 62.5);
  }
}
