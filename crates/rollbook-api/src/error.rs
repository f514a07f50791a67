//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Expected outcomes carry their structured detail in the body. Store
//! failures are logged with their source chain and answered with a bare 500.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rollbook_core::{
  Error,
  error::{Field, ValidationError, ValidationReason},
};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// A body rejected before it reached validation, e.g. a missing
  /// `content-type`.
  #[error("{1}")]
  Rejected(StatusCode, String),

  #[error(transparent)]
  Core(#[from] Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Rejected(status, m) => (*status, json!({ "error": m })),
      ApiError::Core(e) => describe(e),
    };
    (status, Json(body)).into_response()
  }
}

/// Undecodable JSON reads as a malformed body so it shares the validation
/// response shape.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    match rejection {
      JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
        let reason = ValidationReason::Malformed(rejection.body_text());
        ApiError::Core(ValidationError::new(Field::Body, reason).into())
      }
      other => ApiError::Rejected(other.status(), other.body_text()),
    }
  }
}

fn describe(e: &Error) -> (StatusCode, Value) {
  match e {
    Error::Validation(v) => (
      StatusCode::BAD_REQUEST,
      json!({ "error": v.to_string(), "validation": v }),
    ),
    Error::DuplicateConflict(conflicts) => (
      StatusCode::CONFLICT,
      json!({ "error": e.to_string(), "conflicts": conflicts }),
    ),
    Error::ReferentialViolation => (
      StatusCode::CONFLICT,
      json!({ "error": e.to_string(), "retryable": true }),
    ),
    Error::NotFound(target) => (
      StatusCode::NOT_FOUND,
      json!({ "error": e.to_string(), "target": target }),
    ),
    Error::PartialBatchFailure { committed, committed_ids, failed_chunk, cause } => {
      let (_, cause) = describe(cause);
      (
        StatusCode::MULTI_STATUS,
        json!({
          "error": format!(
            "bulk import stopped at chunk {failed_chunk} after committing {committed} record(s)"
          ),
          "committed": committed,
          "committed_ids": committed_ids,
          "failed_chunk": failed_chunk,
          "cause": cause,
        }),
      )
    }
    Error::Infrastructure(source) => {
      tracing::error!(error = %chain(source.as_ref()), "store failure");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "internal server error" }),
      )
    }
  }
}

fn chain(e: &(dyn std::error::Error + 'static)) -> String {
  let mut out = e.to_string();
  let mut next = e.source();
  while let Some(cause) = next {
    out.push_str(": ");
    out.push_str(&cause.to_string());
    next = cause.source();
  }
  out
}
