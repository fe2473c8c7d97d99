use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes console logging, plus a JSON file layer when `to_file` is set.
///
/// `RUST_LOG` overrides the configured level. The returned guard must be held
/// until exit so buffered file output is flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Console format carries target and source location
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let (file_layer, guard) = if config.to_file {
        match fs::create_dir_all(&config.dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file);
                let (writer, guard) = tracing_appender::non_blocking(file_appender);
                (Some(fmt::layer().json().with_writer(writer)), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Cannot create log directory {}: {}; logging to console only",
                    config.dir.display(),
                    e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
    if installed.is_err() {
        // A subscriber is already set (e.g. a second init in tests)
        return None;
    }
    guard
}
