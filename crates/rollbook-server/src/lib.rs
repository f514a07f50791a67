//! HTTP host for Rollbook.
//!
//! Loads [`ServerConfig`], mounts the JSON API under `/api` and wraps it in
//! request tracing. The binary in `main.rs` wires this to a SQLite store.

use std::path::{Path, PathBuf};

use axum::Router;
use rollbook_core::{AttendanceService, import::ImportOptions, store::AttendanceStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROLLBOOK_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub import:     ImportOptions,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       5300,
      store_path: PathBuf::from("rollbook.db"),
      import:     ImportOptions::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the environment over the TOML file at `path`. A missing file is
  /// not an error.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROLLBOOK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn app<S>(service: AttendanceService<S>) -> Router
where
  S: AttendanceStore + 'static,
{
  Router::new()
    .nest("/api", rollbook_api::api_router(service))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use rollbook_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn router() -> (Router, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let service = AttendanceService::new(Arc::new(store.clone()), ImportOptions::default());
    (app(service), store)
  }

  // ── Configuration ─────────────────────────────────────────────────────────

  #[test]
  fn missing_config_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.port, 5300);
    assert_eq!(cfg.store_path, PathBuf::from("rollbook.db"));
    assert_eq!(cfg.import.chunk_size, 100);
    assert!(cfg.import.reject_batch_duplicates);
  }

  #[test]
  fn partial_toml_keeps_remaining_defaults() {
    let toml = r#"
      port = 8080

      [import]
      chunk_size = 25
    "#;
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.import.chunk_size, 25);
    assert!(cfg.import.reject_batch_duplicates);
  }

  // ── Routing ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_is_mounted_under_api() {
    let (app, _) = router().await;
    let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn unmounted_path_is_404() {
    let (app, _) = router().await;
    let req = Request::builder().uri("/attendance").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn records_round_trip_through_the_full_stack() {
    let (app, store) = router().await;
    let student = store.add_student("Edsger Dijkstra", None).await.unwrap();
    let subject = store.add_subject("Algorithms", "CS201", None).await.unwrap();

    let body = serde_json::json!({
      "student_id": student.id,
      "subject_id": subject.id,
      "date": "2024-05-06",
      "status": "late",
      "remarks": "  ",
    });
    let req = Request::builder()
      .method("POST")
      .uri("/api/attendance")
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = Request::builder()
      .uri(format!("/api/attendance?student_id={}", student.id))
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let page: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["records"][0]["status"], "late");
    assert!(page["records"][0]["remarks"].is_null());
  }
}
