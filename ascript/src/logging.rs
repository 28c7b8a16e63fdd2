// Logging for the AsyncScript runtime
//
// Everything in the runtime logs through `tracing`. This module installs a
// subscriber and provides span and event macros with the field names the
// runtime uses (`actor`, `definition`, `handler`, `event`).
//
// # Usage Examples
//
// ```rust
// use ascript::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or a custom configuration
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     target_filters: Some("ascript::runtime::scheduler=trace".to_string()),
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// Runtime events can be narrowed with `RUST_LOG`, for example
// `RUST_LOG=ascript::runtime::binding=trace` shows every routed emission.

use std::io;
use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration of the logging subscriber.
///
/// # Examples
///
/// ```rust
/// use ascript::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     json_format: true,
///     ..Default::default()
/// };
/// assert!(config.show_time);
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
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
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Only the first initialization takes effect
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(filters) = &config.target_filters {
        for directive in filters.split(',') {
            match directive.trim().parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(err) => eprintln!("Ignoring log filter '{}': {}", directive, err),
            }
        }
    }
    filter
}

/// Installs the global subscriber described by `config`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else if config.show_time {
            Box::new(
                registry.with(
                    fmt::layer()
                        .with_ansi(atty::is(atty::Stream::Stdout))
                        .with_file(config.show_file_line)
                        .with_line_number(config.show_file_line)
                        .with_thread_names(config.show_thread_info)
                        .with_thread_ids(config.show_thread_info),
                ),
            )
        } else {
            Box::new(
                registry.with(
                    fmt::layer()
                        .without_time()
                        .with_ansi(atty::is(atty::Stream::Stdout))
                        .with_file(config.show_file_line)
                        .with_line_number(config.show_file_line)
                        .with_thread_names(config.show_thread_info)
                        .with_thread_ids(config.show_thread_info),
                ),
            )
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

/// Opens `path` for appending, creating it if needed.
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Box::new(file))
}

/// Logs to the console and, without colors, to `log_file`.
///
/// # Errors
/// Returns the I/O error when the log file cannot be opened.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    // Fail early instead of silently falling back to stderr later
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let path = log_file.to_string();
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || match file_writer(&path) {
                Ok(writer) => writer,
                Err(_) => Box::new(io::stderr()),
            })
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
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

/// DEBUG level for the runtime, TRACE for scheduling and binding routing.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some(
            "ascript=debug,ascript::runtime::scheduler=trace,ascript::runtime::binding=trace"
                .to_string(),
        ),
        ..LogConfig::default()
    });
}

/// JSON output at INFO level without file/line information.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        ..LogConfig::default()
    });
}

/// WARN level, compact output for test runs.
///
/// ```rust
/// #[test]
/// fn my_test() {
///     ascript::logging::init_test();
/// }
/// ```
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        show_thread_info: false,
        show_time: false,
        ..LogConfig::default()
    });
}

/// Span covering work done on behalf of one actor.
///
/// ```rust
/// let span = ascript::actor_span!("Echo", "ascript://sys/Echo#2");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! actor_span {
    ($definition:expr, $actor:expr) => {
        tracing::info_span!("actor", definition = $definition, actor = $actor)
    };
    ($definition:expr, $actor:expr, $($fields:tt)*) => {
        tracing::info_span!("actor", definition = $definition, actor = $actor, $($fields)*)
    };
}

/// Span covering one handler invocation.
#[macro_export]
macro_rules! message_span {
    ($handler:expr) => {
        tracing::debug_span!("message", handler = $handler)
    };
    ($handler:expr, $($fields:tt)*) => {
        tracing::debug_span!("message", handler = $handler, $($fields)*)
    };
}

/// Actor lifecycle transition (spawned, running, stopped, failed).
#[macro_export]
macro_rules! log_lifecycle {
    ($actor:expr, $event:expr) => {
        tracing::info!(actor = $actor, event = $event)
    };
    ($actor:expr, $event:expr, $($fields:tt)*) => {
        tracing::info!(actor = $actor, event = $event, $($fields)*)
    };
}

/// Scheduler event (queued, picked, released).
#[macro_export]
macro_rules! log_scheduler {
    ($scheduler:expr, $event:expr) => {
        tracing::trace!(scheduler = $scheduler, event = $event)
    };
    ($scheduler:expr, $event:expr, $($fields:tt)*) => {
        tracing::trace!(scheduler = $scheduler, event = $event, $($fields)*)
    };
}

pub use tracing::{debug, error, info, trace, warn};
