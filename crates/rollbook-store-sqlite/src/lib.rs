//! SQLite backend for the Rollbook attendance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The `(student_id, subject_id, date)`
//! uniqueness invariant and the student/subject references are enforced by
//! table constraints.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
