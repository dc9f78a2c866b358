//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "warn";

/// Start logging to `path`, filtered by `RUST_LOG` (default `warn`).
///
/// Keep the returned guard alive until exit so buffered lines get written.
/// Returns `None` when the log directory cannot be created.
pub fn init_file_logging(path: &Path) -> Option<WorkerGuard> {
    let dir = path.parent()?;
    let file_name = path.file_name()?;
    std::fs::create_dir_all(dir).ok()?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init()
        .ok()?;

    Some(guard)
}
