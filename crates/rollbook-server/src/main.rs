//! rollbook server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, and serves the attendance API over HTTP.
//!
//! # Roster setup
//!
//! Attendance can only reference students and subjects the store already
//! knows. Seed them with:
//!
//! ```text
//! rollbook add-student "Ada Lovelace"
//! rollbook add-subject "Analytical Engines" ENG210
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rollbook_core::AttendanceService;
use rollbook_server::ServerConfig;
use rollbook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Rollbook attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Register a student and print its id.
  AddStudent {
    name:      String,
    #[arg(long)]
    course_id: Option<Uuid>,
  },
  /// Register a subject and print its id.
  AddSubject {
    name:      String,
    code:      String,
    #[arg(long)]
    course_id: Option<Uuid>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::AddStudent { name, course_id } => {
      let student = store
        .add_student(&name, course_id)
        .await
        .context("failed to add student")?;
      println!("{}", student.id);
      Ok(())
    }
    Command::AddSubject { name, code, course_id } => {
      let subject = store
        .add_subject(&name, &code, course_id)
        .await
        .context("failed to add subject")?;
      println!("{}", subject.id);
      Ok(())
    }
  }
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let service = AttendanceService::new(Arc::new(store), server_cfg.import);
  let app = rollbook_server::app(service);
  let address = server_cfg.address();

  tracing::info!(
    chunk_size = server_cfg.import.chunk_size,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
