//! Students and subjects, as seen from the attendance subsystem.
//!
//! Both are owned by other modules of the platform. Attendance only resolves
//! them by id and reads their display fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:        Uuid,
  pub name:      String,
  pub course_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:        Uuid,
  pub name:      String,
  /// Catalogue code, e.g. `CS101`.
  pub code:      String,
  pub course_id: Option<Uuid>,
}
