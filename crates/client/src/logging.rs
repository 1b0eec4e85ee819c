//! Logging to stderr and a per-session log file.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Platform-specific log directory.
///
/// - macOS: `~/Library/Caches/farmbot/logs`
/// - Linux: `~/.cache/farmbot/logs` (or `$XDG_CACHE_HOME/farmbot/logs`)
/// - Windows: `%LOCALAPPDATA%\farmbot\cache\logs`
/// - Fallback: `<tmp>/farmbot/logs`
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "farmbot")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("farmbot"))
        .join("logs")
}

/// `session_<unix seconds>` unless an id was given.
pub fn session_id(requested: Option<&str>) -> String {
    requested.map(str::to_string).unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!("session_{timestamp}")
    })
}

/// Setup logging to both stderr and `<log_dir>/<session>/bot.log`.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the whole run.
pub fn setup_logging(session: Option<&str>, log_dir: Option<&Path>) -> Result<WorkerGuard> {
    let session_id = session_id(session);
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(default_log_dir);

    let session_log_dir = log_dir.join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!("Failed to create log directory {}", session_log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "bot.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/bot.log", session_log_dir.display());

    Ok(guard)
}
