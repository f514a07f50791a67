//! SQL schema for the Rollbook SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Roster tables are written by the student and subject modules.
CREATE TABLE IF NOT EXISTS students (
    student_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    course_id   TEXT
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    code        TEXT NOT NULL,
    course_id   TEXT
);

-- Referenced students and subjects cannot be deleted while attendance
-- points at them.
CREATE TABLE IF NOT EXISTS attendance (
    attendance_id TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES students(student_id) ON DELETE RESTRICT,
    subject_id    TEXT NOT NULL REFERENCES subjects(subject_id) ON DELETE RESTRICT,
    date          TEXT NOT NULL,   -- YYYY-MM-DD
    status        TEXT NOT NULL
                  CHECK (status IN ('present', 'absent', 'late', 'excused')),
    remarks       TEXT,
    created_at    TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at    TEXT NOT NULL,
    UNIQUE (student_id, subject_id, date)
);

CREATE INDEX IF NOT EXISTS attendance_subject_idx ON attendance(subject_id, date);
CREATE INDEX IF NOT EXISTS attendance_date_idx    ON attendance(date);

PRAGMA user_version = 1;
";
