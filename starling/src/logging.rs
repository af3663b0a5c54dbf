// Logging System for Starling
//
// This module provides the logging setup used by the Starling runtime. It is
// built on the `tracing` ecosystem: the runtime emits structured events with
// the `tracing` macros, and applications pick how those events are rendered by
// installing a subscriber through one of the `init*` functions below.
//
// # Usage Examples
//
// ```rust
// use starling::logging::{self, LogConfig, LogLevel};
//
// // Human-readable console output at INFO
// logging::init_default();
//
// // Or choose the threshold explicitly
// logging::init(LogConfig::with_level(LogLevel::Verbose));
// ```
//
// Thread pools capture the dispatcher that is active when they are created
// (see `current_subscriber`) and install it on every worker thread, so worker
// output follows the same configuration as the thread that built the pool.

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Once};

use tracing::{Level, Subscriber};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Severity threshold for runtime output.
///
/// `Verbose` is the most detailed level and maps onto `tracing`'s TRACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Verbose => Level::TRACE,
        }
    }
}

/// Configuration for the Starling logging system
///
/// # Examples
///
/// ```rust
/// use starling::logging::{LogConfig, LogLevel};
///
/// let config = LogConfig {
///     level: LogLevel::Debug,
///     json_format: true,
///     target_filters: Some("starling::thread::scheduler=trace".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to display
    pub level: LogLevel,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let threshold = LevelFilter::from_level(self.level.into());
        let mut env_filter = EnvFilter::from_default_env().add_directive(threshold.into());
        if let Some(filters) = &self.target_filters {
            for filter in filters.split(',') {
                match filter.trim().parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(e) => eprintln!("Ignoring invalid log filter '{filter}': {e}"),
                }
            }
        }
        env_filter
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

/// Install the global subscriber described by `config`.
///
/// Only the first call to any `init*` function takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(config.env_filter());

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(
                registry.with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_file(config.show_file_line)
                        .with_line_number(config.show_file_line)
                        .with_thread_names(config.show_thread_info)
                        .with_thread_ids(config.show_thread_info),
                ),
            )
        } else {
            let layer = fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info);
            if config.show_time {
                Box::new(registry.with(layer))
            } else {
                Box::new(registry.with(layer.without_time()))
            }
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Initialize logging to both the console and `log_file`.
///
/// The file is opened in append mode, and created if missing, before anything
/// is installed. File output is always plain text with file, line and thread
/// information.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?,
    );

    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(file)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG level with TRACE for the scheduler, colored output and locations.
pub fn init_development() {
    init(development_config());
}

pub fn init_development_with_file(path: &str) -> io::Result<()> {
    init_with_file(development_config(), path)
}

fn development_config() -> LogConfig {
    LogConfig {
        level: LogLevel::Debug,
        target_filters: Some("starling=debug,starling::thread::scheduler=trace".to_string()),
        ..Default::default()
    }
}

/// JSON output at INFO, without file/line information.
pub fn init_production() {
    init(LogConfig {
        level: LogLevel::Info,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// Warnings and errors only, compact output.
///
/// Safe to call at the start of every test.
pub fn init_test() {
    init(LogConfig {
        level: LogLevel::Warn,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

/// Create a span for work done on behalf of one actor
///
/// # Examples
///
/// ```rust
/// let span = starling::actor_span!("ping", 3);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! actor_span {
    ($actor_name:expr, $pid:expr) => {
        tracing::info_span!("actor", name = $actor_name, pid = $pid)
    };
    ($actor_name:expr, $pid:expr, $($fields:tt)*) => {
        tracing::info_span!("actor", name = $actor_name, pid = $pid, $($fields)*)
    };
}

/// Log actor lifecycle events - use for actor state changes
///
/// ```rust
/// starling::log_lifecycle!("actor", "ping", "spawned", pid = 3);
/// ```
#[macro_export]
macro_rules! log_lifecycle {
    ($actor_type:expr, $actor_id:expr, $event:expr) => {
        tracing::info!(actor_type = $actor_type, actor_id = $actor_id, event = $event);
    };
    ($actor_type:expr, $actor_id:expr, $event:expr, $($fields:tt)*) => {
        tracing::info!(actor_type = $actor_type, actor_id = $actor_id, event = $event, $($fields)*);
    };
}

/// Log system events - use for actor system state changes
#[macro_export]
macro_rules! log_system {
    ($operation:expr, $status:expr) => {
        tracing::info!(operation = $operation, status = $status);
    };
    ($operation:expr, $status:expr, $($fields:tt)*) => {
        tracing::info!(operation = $operation, status = $status, $($fields)*);
    };
}

/// Log error events
///
/// ```rust
/// let error = starling::PromiseError::AlreadyResolved;
/// starling::log_error!(error, component = "promise");
/// ```
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {
        tracing::error!(error = %$error);
    };
    ($error:expr, $($fields:tt)*) => {
        tracing::error!(error = %$error, $($fields)*);
    };
}

/// Log scheduling events
#[macro_export]
macro_rules! log_scheduler {
    ($scheduler:expr, $event:expr) => {
        tracing::debug!(scheduler = $scheduler, event = $event);
    };
    ($scheduler:expr, $event:expr, $($fields:tt)*) => {
        tracing::debug!(scheduler = $scheduler, event = $event, $($fields)*);
    };
}

/// Get the current tracing dispatcher
///
/// Used when spawning threads that should log through the same subscriber as
/// the current thread.
///
/// ```rust
/// use std::thread;
///
/// let dispatcher = starling::logging::current_subscriber();
/// thread::spawn(move || {
///     tracing::dispatcher::with_default(&dispatcher, || {
///         tracing::info!("worker thread started");
///     });
/// })
/// .join()
/// .unwrap();
/// ```
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

// Re-export the most commonly used tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(Level::from(LogLevel::Verbose), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert!(LogLevel::Verbose > LogLevel::Info);
    }

    #[test]
    fn test_invalid_filters_are_skipped() {
        let config = LogConfig {
            target_filters: Some("starling=debug,=,starling::thread=trace".to_string()),
            ..LogConfig::with_level(LogLevel::Warn)
        };
        // Must not panic on the malformed entry.
        let _ = config.env_filter();
    }
}
