//! 日志系统
//!
//! stdout 只输出 JSON 结果，日志一律写到 stderr，可选再写一份到文件。

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,procpool=debug";

/// Filter precedence: explicit level, then `RUST_LOG`, then [`DEFAULT_FILTER`].
fn build_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    match log_level {
        Some(level) => Ok(EnvFilter::try_new(level)?),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Install the global subscriber.
///
/// `log_file` is opened in append mode; its parent directory is created
/// (the runtime dir under /tmp usually does not exist yet).
///
/// ```no_run
/// use procpool::utils::config_paths::ConfigPaths;
/// use procpool::utils::logger::init_logger;
///
/// init_logger(Some("debug"), Some(&ConfigPaths::runtime_log_file())).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(std::sync::Arc::new(file))
                    .with_target(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(log_level)?)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(file = ?log_file, "Logger initialized");
    Ok(())
}
