//! Handlers for `/attendance` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/attendance` | Filters + `page`/`limit`; returns a [`Page`] |
//! | `POST`   | `/attendance` | Body: [`AttendanceCandidate`]; returns 201 + stored record |
//! | `GET`    | `/attendance/{id}` | Single record |
//! | `PUT`    | `/attendance/{id}` | Body: [`UpdateBody`]; only `status` and `remarks` change |
//! | `DELETE` | `/attendance/{id}` | Returns `{"deleted": id}` |
//! | `POST`   | `/attendance/bulk` | Body: [`BulkBody`]; returns 201 + `{records, count}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use rollbook_core::{
  AttendanceService,
  import::ImportOutcome,
  record::{AttendanceCandidate, AttendancePatch, AttendanceRecord},
  store::{AttendanceFilter, AttendanceStore, Page, PageRequest},
  validate::parse_status,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{error::ApiError, extract::JsonBody, paired_range};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub student_id: Option<Uuid>,
  pub subject_id: Option<Uuid>,
  pub date:       Option<NaiveDate>,
  /// One of `present`, `absent`, `late`, `excused`.
  pub status:     Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub page:       Option<u32>,
  pub limit:      Option<u32>,
}

/// `GET /attendance[?student_id=..][&subject_id=..][&date=..][&status=..][&start_date=..&end_date=..][&page=..][&limit=..]`
pub async fn list<S>(
  State(service): State<AttendanceService<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page>, ApiError>
where
  S: AttendanceStore,
{
  let (start_date, end_date) = paired_range(params.start_date, params.end_date)?;
  let status = params
    .status
    .as_deref()
    .map(parse_status)
    .transpose()
    .map_err(rollbook_core::Error::from)?;

  let filter = AttendanceFilter {
    student_id: params.student_id,
    subject_id: params.subject_id,
    date: params.date,
    start_date,
    end_date,
    status,
  };
  let page = PageRequest::new(
    params.page.unwrap_or(1),
    params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
  );

  Ok(Json(service.list(&filter, page).await?))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /attendance/{id}`
pub async fn get_one<S>(
  State(service): State<AttendanceService<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AttendanceRecord>, ApiError>
where
  S: AttendanceStore,
{
  Ok(Json(service.get(id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /attendance`: returns 201 + the stored record.
pub async fn create<S>(
  State(service): State<AttendanceService<S>>,
  JsonBody(body): JsonBody<AttendanceCandidate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore,
{
  let record = service.create(&body).await?;
  tracing::info!(id = %record.id, key = %record.key(), "attendance recorded");
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /attendance/{id}`.
///
/// Identity fields sent alongside are ignored. An empty `remarks` string
/// clears the stored remarks; omitting it leaves them unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub status:  Option<String>,
  pub remarks: Option<String>,
}

impl UpdateBody {
  fn into_patch(self) -> Result<AttendancePatch, ApiError> {
    let status = self
      .status
      .as_deref()
      .map(parse_status)
      .transpose()
      .map_err(rollbook_core::Error::from)?;
    Ok(AttendancePatch { status, remarks: self.remarks.map(Some) })
  }
}

/// `PUT /attendance/{id}`
pub async fn update_one<S>(
  State(service): State<AttendanceService<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<UpdateBody>,
) -> Result<Json<AttendanceRecord>, ApiError>
where
  S: AttendanceStore,
{
  let record = service.update(id, body.into_patch()?).await?;
  Ok(Json(record))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /attendance/{id}`
pub async fn delete_one<S>(
  State(service): State<AttendanceService<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: AttendanceStore,
{
  service.delete(id).await?;
  tracing::info!(%id, "attendance deleted");
  Ok(Json(json!({ "deleted": id })))
}

// ─── Bulk ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BulkBody {
  #[serde(default)]
  pub records: Vec<AttendanceCandidate>,
}

/// `POST /attendance/bulk`: all-or-nothing validation, then chunked insert.
pub async fn bulk<S>(
  State(service): State<AttendanceService<S>>,
  JsonBody(body): JsonBody<BulkBody>,
) -> Result<(StatusCode, Json<ImportOutcome>), ApiError>
where
  S: AttendanceStore,
{
  let outcome = service.bulk_create(&body.records).await?;
  tracing::info!(count = outcome.count, "bulk import committed");
  Ok((StatusCode::CREATED, Json(outcome)))
}
