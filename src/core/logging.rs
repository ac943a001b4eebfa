//! Process-wide tracing setup.
//!
//! Events go to stdout and to a daily-rolling `localai-engine.log` under the
//! log directory. The filter comes from `LOCALAI_LOG`, then `RUST_LOG`, then
//! [`DEFAULT_DIRECTIVES`], which keeps the engine's own debug events and the
//! per-request spans of the HTTP trace layer.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

pub const LOG_FILE_PREFIX: &str = "localai-engine.log";
pub const LOG_ENV: &str = "LOCALAI_LOG";
pub const DEFAULT_DIRECTIVES: &str = "info,localai_engine=debug,tower_http=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Picks the first non-blank directive string.
pub fn filter_directives(engine_env: Option<String>, rust_log: Option<String>) -> String {
    [engine_env, rust_log]
        .into_iter()
        .flatten()
        .map(|raw| raw.trim().to_string())
        .find(|raw| !raw.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}

fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("Invalid log filter '{}': {}, using defaults", directives, err);
        EnvFilter::new(DEFAULT_DIRECTIVES)
    })
}

/// Installs stdout and file logging. Later calls keep the first subscriber.
pub fn init(paths: &AppPaths) {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );

    // Console stays compact; the file keeps targets for grepping by module.
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    let file_layer = match std::fs::create_dir_all(&paths.log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(writer),
            )
        }
        Err(err) => {
            eprintln!(
                "Cannot create log directory {}: {}, logging to stdout only",
                paths.log_dir.display(),
                err
            );
            None
        }
    };

    let installed = tracing_subscriber::registry()
        .with(build_filter(&directives))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            "Logging to {} with filter '{}'",
            paths.log_dir.join(LOG_FILE_PREFIX).display(),
            directives
        );
    }
}
