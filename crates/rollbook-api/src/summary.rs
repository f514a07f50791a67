//! Handlers for `/attendance/summary` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attendance/summary/student/{id}` | Optional `subject_id`, `start_date`+`end_date` |
//! | `GET`  | `/attendance/summary/subject/{id}` | Optional `date`, `start_date`+`end_date` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use rollbook_core::{
  AttendanceService,
  store::AttendanceStore,
  summary::{DateWindow, StudentReport, SubjectReport},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, paired_range};

#[derive(Debug, Deserialize)]
pub struct StudentParams {
  pub subject_id: Option<Uuid>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

/// `GET /attendance/summary/student/{id}`
pub async fn student<S>(
  State(service): State<AttendanceService<S>>,
  Path(student_id): Path<Uuid>,
  Query(params): Query<StudentParams>,
) -> Result<Json<StudentReport>, ApiError>
where
  S: AttendanceStore,
{
  let (start_date, end_date) = paired_range(params.start_date, params.end_date)?;
  let window = DateWindow { date: None, start_date, end_date };
  let report = service
    .student_report(student_id, params.subject_id, window)
    .await?;
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct SubjectParams {
  pub date:       Option<NaiveDate>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

/// `GET /attendance/summary/subject/{id}`
pub async fn subject<S>(
  State(service): State<AttendanceService<S>>,
  Path(subject_id): Path<Uuid>,
  Query(params): Query<SubjectParams>,
) -> Result<Json<SubjectReport>, ApiError>
where
  S: AttendanceStore,
{
  let (start_date, end_date) = paired_range(params.start_date, params.end_date)?;
  let window = DateWindow { date: params.date, start_date, end_date };
  Ok(Json(service.subject_report(subject_id, window).await?))
}
