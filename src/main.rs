// CourseMind - Study guides, quizzes and chat for course material
//
// A single HTTP service that turns pasted or uploaded course text into
// chapter lists, study guides and quizzes with a generative model.
//
// Architecture:
// - Server (axum): JSON API, one state machine per browser session
// - Session: IDLE -> PARSING -> CONFIGURING -> LOADING -> SUCCESS/ERROR
// - LLM: Gemini client with structured-output schemas
// - Ingest: PDF, DOCX and text extraction, Google Drive downloads
// - Export/Render: PDF study guide and HTML document view
// - Storage/Auth: saved analyses (SQLite or Firestore), Firebase sign-in

mod auth;
mod cli;
mod config;
mod export;
mod ingest;
mod llm;
mod models;
mod render;
mod server;
mod session;
mod startup;
mod storage;
mod util;

use anyhow::Result;
use config::{Config, LogRotation, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the tracing subscriber
///
/// Stdout always gets human-readable output; the optional file layer writes
/// JSON. The returned guard must live until exit so buffered lines flush.
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!(
        "coursemind={},tower_http=info,axum=info",
        logging.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    if !logging.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&logging.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            logging.file_dir, e
        );
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return None;
    }

    let file_appender = match logging.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
        }
        LogRotation::Daily => {
            tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
        }
        LogRotation::Never => {
            tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --edit, --path)
    if cli::handle_cli() {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env()?;
    let _file_guard = init_tracing(&config.logging);

    startup::print_startup(&config);
    if config.logging.file_enabled {
        startup::log_startup(&config);
    }

    let state = server::AppState::from_config(&config)?;
    server::start_server(config.bind_addr, state).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
