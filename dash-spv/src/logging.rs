//! Logging setup for hosts of the LLMQ services.
//!
//! Output goes to the console, to `run.log` in a log directory, or both. On start the
//! `run.log` of the previous run is archived under a timestamped name and old archives
//! beyond the configured count are deleted.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{LoggingError, LoggingResult};

const ARCHIVE_PREFIX: &str = "dash-llmq.";
const ARCHIVE_SUFFIX: &str = ".log";
const ACTIVE_LOG_NAME: &str = "run.log";
const ARCHIVE_TIMESTAMP: &str = "%Y-%m-%d.%H%M%S";

/// Keeps the non-blocking file writer alive. Buffered entries are flushed when dropped.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Where log output goes and how verbose it is.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level filter. `None` reads `RUST_LOG` and falls back to INFO.
    pub level: Option<LevelFilter>,
    /// Log to stderr.
    pub console: bool,
    pub file: Option<LogFileConfig>,
}

#[derive(Debug, Clone)]
pub struct LogFileConfig {
    pub log_dir: PathBuf,
    /// Number of archived run logs kept next to `run.log`.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: None,
            console: true,
            file: None,
        }
    }
}

/// Console logging at `level`.
pub fn init_console_logging(level: LevelFilter) -> LoggingResult<LoggingGuard> {
    init_logging(LoggingConfig {
        level: Some(level),
        console: true,
        file: None,
    })
}

/// Installs the global tracing subscriber described by `config`.
///
/// Fails when the log directory can not be prepared or a global subscriber is already set.
/// With neither console nor file output nothing is installed and the macros stay no-ops.
///
/// ```no_run
/// use dash_spv::logging::{LogFileConfig, LoggingConfig, init_logging};
/// use dash_spv::LevelFilter;
///
/// let _guard = init_logging(LoggingConfig {
///     level: Some(LevelFilter::DEBUG),
///     console: false,
///     file: Some(LogFileConfig {
///         log_dir: "./logs".into(),
///         max_files: 10,
///     }),
/// })?;
/// # Ok::<(), dash_spv::LoggingError>(())
/// ```
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingGuard> {
    if !config.console && config.file.is_none() {
        return Ok(LoggingGuard {
            _file_writer: None,
        });
    }

    let filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
    };

    let mut file_writer = None;
    let file_layer = match config.file.as_ref() {
        Some(file_config) => {
            let (writer, guard) = open_run_log(file_config)?;
            file_writer = Some(guard);
            Some(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
        }
        None => None,
    };
    let console_layer = config.console.then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;

    Ok(LoggingGuard {
        _file_writer: file_writer,
    })
}

/// Archives the previous run, drops surplus archives and opens a fresh `run.log`.
fn open_run_log(config: &LogFileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.log_dir)?;
    archive_previous_run(&config.log_dir)?;
    remove_surplus_archives(&config.log_dir, config.max_files)?;
    let file = File::create(config.log_dir.join(ACTIVE_LOG_NAME))?;
    Ok(tracing_appender::non_blocking(file))
}

fn archive_name(timestamp: &DateTime<Local>, collision: Option<u32>) -> String {
    let stamp = timestamp.format(ARCHIVE_TIMESTAMP);
    match collision {
        None => format!("{ARCHIVE_PREFIX}{stamp}{ARCHIVE_SUFFIX}"),
        Some(n) => format!("{ARCHIVE_PREFIX}{stamp}-{n}{ARCHIVE_SUFFIX}"),
    }
}

fn is_archive(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX)
}

/// Renames `run.log` to `dash-llmq.YYYY-MM-DD.HHMMSS.log`, stamped with its modification time.
fn archive_previous_run(log_dir: &Path) -> LoggingResult<()> {
    let run_log = log_dir.join(ACTIVE_LOG_NAME);
    if !run_log.exists() {
        return Ok(());
    }

    let modified = fs::metadata(&run_log)
        .and_then(|metadata| metadata.modified())
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());

    let target = std::iter::once(None)
        .chain((1..=999).map(Some))
        .map(|collision| log_dir.join(archive_name(&modified, collision)))
        .find(|path| !path.exists())
        .ok_or_else(|| {
            LoggingError::RotationFailed("too many archives with the same timestamp".to_string())
        })?;

    fs::rename(&run_log, &target).map_err(|e| LoggingError::RotationFailed(e.to_string()))
}

/// Deletes the oldest archives until at most `max_files` remain. `run.log` is never touched.
fn remove_surplus_archives(log_dir: &Path, max_files: usize) -> LoggingResult<()> {
    let entries = fs::read_dir(log_dir)
        .map_err(|e| LoggingError::RotationFailed(format!("failed to read log dir: {e}")))?;
    let mut archives: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_archive))
        .map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok();
            (modified, entry.path())
        })
        .collect();

    if archives.len() <= max_files {
        return Ok(());
    }

    archives.sort();
    let surplus = archives.len() - max_files;
    for (_, path) in archives.into_iter().take(surplus) {
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
        }
    }
    Ok(())
}
