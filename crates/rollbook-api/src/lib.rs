//! JSON REST API for Rollbook.
//!
//! Exposes an axum [`Router`] backed by an [`AttendanceService`] over any
//! [`rollbook_core::store::AttendanceStore`]. TLS, auth, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollbook_api::api_router(service.clone()))
//! ```

pub mod attendance;
pub mod error;
pub mod extract;
pub mod summary;

use axum::{
  Json, Router,
  routing::{get, post},
};
use chrono::NaiveDate;
use rollbook_core::{AttendanceService, store::AttendanceStore};
use serde_json::{Value, json};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: AttendanceService<S>) -> Router<()>
where
  S: AttendanceStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Records
    .route(
      "/attendance",
      get(attendance::list::<S>).post(attendance::create::<S>),
    )
    .route("/attendance/bulk", post(attendance::bulk::<S>))
    .route(
      "/attendance/{id}",
      get(attendance::get_one::<S>)
        .put(attendance::update_one::<S>)
        .delete(attendance::delete_one::<S>),
    )
    // Summaries
    .route("/attendance/summary/student/{id}", get(summary::student::<S>))
    .route("/attendance/summary/subject/{id}", get(summary::subject::<S>))
    .with_state(service)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// A date range is only meaningful with both ends.
fn paired_range(
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ApiError> {
  match (start, end) {
    (Some(s), Some(e)) if s > e => Err(ApiError::BadRequest(format!(
      "start_date {s} is after end_date {e}"
    ))),
    (Some(_), None) | (None, Some(_)) => Err(ApiError::BadRequest(
      "start_date and end_date must be given together".into(),
    )),
    range => Ok(range),
  }
}
