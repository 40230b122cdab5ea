use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_env_filter(env_filter: String) {
    let _ = env::var("RUST_LOG").is_err_and(|_| {
        env::set_var("RUST_LOG", env_filter);
        true
    });
}

/// Console-only logging, for tests and one-off tools.
pub fn set_log(env_filter: String) {
    default_env_filter(env_filter);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}

/// Console logging plus a daily-rolling log file `<dir>/<prefix>.YYYY-MM-DD`.
/// The returned guard must be held for the life of the process or buffered
/// log lines are lost on shutdown.
pub fn set_log_with_daily_file(
    env_filter: String,
    dir: impl AsRef<Path>,
    prefix: &str,
) -> WorkerGuard {
    default_env_filter(env_filter);
    let appender = tracing_appender::rolling::daily(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    guard
}
