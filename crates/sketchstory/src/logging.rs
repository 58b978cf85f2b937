use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::LoggingConfig;

const LOG_SUFFIX: &str = "log";

fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Log file name, without extension, for a session started now.
fn log_file_stem() -> String {
    format!("sketchstory_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Open `<dir>/<stem>.log` for appending. Missing directories are created.
fn open_log_file(dir: &Path, stem: &str) -> Result<(RollingFileAppender, PathBuf), String> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(stem)
        .filename_suffix(LOG_SUFFIX)
        .build(dir)
        .map_err(|e| e.to_string())?;
    Ok((appender, dir.join(format!("{stem}.{LOG_SUFFIX}"))))
}

/// Set up tracing-subscriber: a timestamped file in `logging.directory` when set,
/// otherwise stderr. Does nothing when logging is disabled.
/// Returns the log file path when logging to a file.
pub fn init_tracing(config: &LoggingConfig) -> Option<PathBuf> {
    if !config.enabled {
        return None;
    }
    let level = parse_level(&config.level);

    if let Some(dir) = config.directory.as_deref() {
        let dir = PathBuf::from(dir);
        match open_log_file(&dir, &log_file_stem()) {
            Ok((file_appender, path)) => {
                let subscriber = tracing_subscriber::fmt()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_max_level(level)
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
                return Some(path);
            }
            Err(e) => eprintln!(
                "[sketchstory] Could not open a log file in {}: {e}, logging to stderr",
                dir.display()
            ),
        }
    }

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    None
}
