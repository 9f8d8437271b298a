use std::{path::Path, sync::LazyLock};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";

const MAX_LOG_FILES: usize = 5;

/// Writes logs into daily rotated `<prefix>.<date>.log` files inside `log_dir`. `show_std`
/// additionally mirrors them to stdout. Without an explicit level `RUST_LOG` is used, falling back
/// to debug for this crate.
pub fn enable_logging(
    prefix: &str,
    log_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    let crate_filter = |level: &str| EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")));
    let filter = match log_level {
        Some(level) => crate_filter(&level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter("debug")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .with_ansi(show_std)
        .pretty()
        .try_init()
        .map_err(|e| anyhow!("cannot set up logging: {e}"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
