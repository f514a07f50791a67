//! [`SqliteStore`]: the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::Utc;
use rollbook_core::{
  record::{AttendancePatch, AttendanceRecord, NewAttendance},
  roster::{Student, Subject},
  store::{AttendanceFilter, AttendanceStore, Page, PageRequest},
};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RECORD_COLUMNS, RawRecord, RawStudent, RawSubject, encode_date, encode_dt,
    encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Roster ────────────────────────────────────────────────────────────────
  //
  // Students and subjects belong to other modules; these writers exist so the
  // owning module (or an operator) can populate the referenced tables.

  /// Register a student and return it with its new id.
  pub async fn add_student(&self, name: &str, course_id: Option<Uuid>) -> Result<Student> {
    let student = Student { id: Uuid::new_v4(), name: name.to_owned(), course_id };

    let id_str     = encode_uuid(student.id);
    let name_str   = student.name.clone();
    let course_str = course_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (student_id, name, course_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name_str, course_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  /// Register a subject and return it with its new id.
  pub async fn add_subject(
    &self,
    name: &str,
    code: &str,
    course_id: Option<Uuid>,
  ) -> Result<Subject> {
    let subject = Subject {
      id: Uuid::new_v4(),
      name: name.to_owned(),
      code: code.to_owned(),
      course_id,
    };

    let id_str     = encode_uuid(subject.id);
    let name_str   = subject.name.clone();
    let code_str   = subject.code.clone();
    let course_str = course_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, name, code, course_id) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name_str, code_str, course_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  /// Remove a student. Fails with a referential violation while attendance
  /// records still point at them; returns `false` if no such student.
  pub async fn remove_student(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM students WHERE student_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn row_exists(&self, sql: &'static str, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![id_str], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Build a record from its insert input, stamping id and timestamps.
fn stamp(input: NewAttendance) -> AttendanceRecord {
  let now = Utc::now();
  AttendanceRecord {
    id:         Uuid::new_v4(),
    student_id: input.student_id,
    subject_id: input.subject_id,
    date:       input.date,
    status:     input.status,
    remarks:    input.remarks,
    created_at: now,
    updated_at: now,
  }
}

/// Column values for an `INSERT`, in [`RECORD_COLUMNS`] order.
fn insert_values(r: &AttendanceRecord) -> [Value; 8] {
  [
    Value::Text(encode_uuid(r.id)),
    Value::Text(encode_uuid(r.student_id)),
    Value::Text(encode_uuid(r.subject_id)),
    Value::Text(encode_date(r.date)),
    Value::Text(encode_status(r.status).to_owned()),
    r.remarks.clone().map_or(Value::Null, Value::Text),
    Value::Text(encode_dt(r.created_at)),
    Value::Text(encode_dt(r.updated_at)),
  ]
}

fn insert_sql() -> String {
  format!(
    "INSERT INTO attendance ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
  )
}

/// Translate a filter into a `WHERE` clause and its positional arguments.
fn where_clause(filter: &AttendanceFilter) -> (String, Vec<Value>) {
  let mut conds: Vec<&'static str> = vec![];
  let mut args: Vec<Value> = vec![];

  let mut push = |cond: &'static str, value: String| {
    conds.push(cond);
    args.push(Value::Text(value));
  };

  if let Some(id) = filter.student_id {
    push("student_id = ?", encode_uuid(id));
  }
  if let Some(id) = filter.subject_id {
    push("subject_id = ?", encode_uuid(id));
  }
  if let Some(d) = filter.date {
    push("date = ?", encode_date(d));
  }
  if let Some(d) = filter.start_date {
    push("date >= ?", encode_date(d));
  }
  if let Some(d) = filter.end_date {
    push("date <= ?", encode_date(d));
  }
  if let Some(s) = filter.status {
    push("status = ?", encode_status(s).to_owned());
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, args)
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = crate::Error;

  // ── Referential lookups ───────────────────────────────────────────────────

  async fn student(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT student_id, name, course_id FROM students WHERE student_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawStudent {
                  student_id: row.get(0)?,
                  name:       row.get(1)?,
                  course_id:  row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, name, code, course_id FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSubject {
                  subject_id: row.get(0)?,
                  name:       row.get(1)?,
                  code:       row.get(2)?,
                  course_id:  row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn student_exists(&self, id: Uuid) -> Result<bool> {
    self.row_exists("SELECT 1 FROM students WHERE student_id = ?1", id).await
  }

  async fn subject_exists(&self, id: Uuid) -> Result<bool> {
    self.row_exists("SELECT 1 FROM subjects WHERE subject_id = ?1", id).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn find(&self, id: Uuid) -> Result<Option<AttendanceRecord>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE attendance_id = ?1");

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn query(&self, filter: &AttendanceFilter, page: PageRequest) -> Result<Page> {
    let (clause, args) = where_clause(filter);
    let count_sql = format!("SELECT COUNT(*) FROM attendance {clause}");
    let page_sql = format!(
      "SELECT {RECORD_COLUMNS} FROM attendance {clause}
       ORDER BY date DESC, created_at DESC
       LIMIT ? OFFSET ?"
    );
    let limit = i64::from(page.limit);
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

    let (total, raws): (i64, Vec<RawRecord>) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row(&count_sql, rusqlite::params_from_iter(args.iter()), |r| r.get(0))?;

        let mut page_args = args;
        page_args.push(Value::Integer(limit));
        page_args.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&page_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(page_args.iter()), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let records = raws
      .into_iter()
      .map(RawRecord::into_record)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page::new(records, total.max(0) as u64, page))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_one(&self, input: NewAttendance) -> Result<AttendanceRecord> {
    let record = stamp(input);
    let values = insert_values(&record);
    let sql = insert_sql();

    self
      .conn
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn insert_many(&self, input: Vec<NewAttendance>) -> Result<Vec<AttendanceRecord>> {
    let records: Vec<AttendanceRecord> = input.into_iter().map(stamp).collect();
    let rows: Vec<[Value; 8]> = records.iter().map(insert_values).collect();
    let sql = insert_sql();

    // One transaction per call: a failing row rolls back the whole chunk.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&sql)?;
          for values in &rows {
            stmt.execute(rusqlite::params_from_iter(values.iter()))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::trace!(count = records.len(), "inserted attendance chunk");
    Ok(records)
  }

  async fn update(&self, id: Uuid, patch: AttendancePatch) -> Result<Option<AttendanceRecord>> {
    let id_str      = encode_uuid(id);
    let status_str  = patch.status.map(encode_status);
    let set_remarks = patch.remarks.is_some();
    let remarks     = patch.remarks.flatten();
    let updated_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE attendance
             SET status     = COALESCE(?2, status),
                 remarks    = CASE WHEN ?3 THEN ?4 ELSE remarks END,
                 updated_at = ?5
           WHERE attendance_id = ?1",
          rusqlite::params![id_str, status_str, set_remarks, remarks, updated_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.find(id).await
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM attendance WHERE attendance_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
