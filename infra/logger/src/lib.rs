//! # Logger
//!
//! Centralized logging for FieldCrypt hosts.
//! It provides a unified way to configure console and file logging with
//! rotation, non-blocking I/O, and environment-based filtering.
//!
//! * Use [`LoggerBuilder::env_filter`] to set module-directed filters
//!   (e.g., `"fcrypt_cryptor=debug,fcrypt_vault=info"`), in addition to `RUST_LOG`.
//! * Use [`LoggerBuilder::audit_path`] to split security events into their own
//!   JSON file. Only events emitted with the [`AUDIT_TARGET`] target land there,
//!   regardless of the configured level.
//! * [`Logger::from_config`] maps a deserialized [`LoggingConfig`] onto the builder.
//!
//! ## Example
//!
//! ```rust
//! # use fcrypt_logger::{Logger, LevelFilter};
//!
//! let _logger = Logger::builder()
//!     .name("my-app")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use fcrypt_domain::constants::AUDIT_TARGET;
pub use fcrypt_domain::config::LoggingConfig;
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Metadata;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";
const AUDIT_FILE_SUFFIX: &str = "audit.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

#[derive(Debug)]
pub struct LoggerConfig {
    console: bool,
    path: Option<PathBuf>,
    audit_path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            path: None,
            audit_path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// A builder for configuring and initializing the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    config: LoggerConfig,
    name: N,
    file_state: std::marker::PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    /// Sets the name of the logger.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder {
            name: WithName(name.into()),
            config: self.config,
            file_state: std::marker::PhantomData,
        }
    }
}

impl LoggerBuilder<WithName, WithFile> {
    /// Configures maximum number of log files to keep.
    ///
    /// The limit applies to the audit trail as well.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.config.max_files = max;
        self
    }

    /// Configures the log file rotation strategy.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// Enables JSON logging for the main log file.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self) -> Self {
        self.config.json = true;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    /// Configures the minimum log level to be emitted.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Adds an explicit env filter (e.g., `fcrypt_cryptor=debug,fcrypt_vault=info`).
    ///
    /// Environment variables still override via `RUST_LOG`; this is a programmatic default.
    /// Invalid filters will cause [`LoggerBuilder::init`] to return an error.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    /// Enables console logging.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Writes audit events (target [`AUDIT_TARGET`]) as JSON lines into `path`.
    ///
    /// The audit file bypasses the level and env filters: rejected bulk updates and
    /// other security events are recorded even when the main log runs at `warn`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit_path = Some(path.into());
        self
    }

    /// Sets the path to log files.
    pub fn path(self, path: impl Into<PathBuf>) -> LoggerBuilder<WithName, WithFile> {
        let mut config = self.config;
        config.path = Some(path.into());
        LoggerBuilder { config, name: self.name, file_state: std::marker::PhantomData }
    }

    /// Consumes the builder and initializes the global tracing subscriber.
    ///
    /// # Returns
    /// A [`Logger`] handle. **Note:** This handle contains the [`WorkerGuard`]s
    /// that must be kept alive for the duration of the program to ensure
    /// that non-blocking logs are flushed correctly.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid builder settings.
    /// Returns [`LoggerError::Appender`] if a log directory cannot be used.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let config = self.config;
        let name = self.name.0;
        validate_config(&config, &name)?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guards = Vec::new();

        if config.console {
            let filter = build_env_filter(&config)?;
            layers.push(layer().compact().with_ansi(true).with_filter(filter).boxed());
        }

        if let Some(path) = &config.path {
            let (writer, guard) = rolling_writer(&config, path, &name, LOG_FILE_SUFFIX)?;
            let file_layer = layer().with_writer(writer).with_ansi(false);
            let filter = build_env_filter(&config)?;
            let boxed = if config.json {
                file_layer.json().with_filter(filter).boxed()
            } else {
                file_layer.with_filter(filter).boxed()
            };
            layers.push(boxed);
            guards.push(guard);
        }

        if let Some(path) = &config.audit_path {
            let (writer, guard) = rolling_writer(&config, path, &name, AUDIT_FILE_SUFFIX)?;
            let audit_layer = layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter_fn(is_audit_event));
            layers.push(audit_layer.boxed());
            guards.push(guard);
        }

        if layers.is_empty() {
            return Err(LoggerError::invalid(
                "No logging layers enabled. Enable console, file output, or an audit trail.",
            ));
        }

        tracing_subscriber::registry().with(layers).try_init()?;

        Ok(Logger { guards })
    }
}

/// A handle to the initialized logging system.
///
/// This struct holds the background worker guards. Drop this struct only
/// when the application is shutting down.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guards: Vec<WorkerGuard>,
}

impl Logger {
    /// Returns a new [`LoggerBuilder`] to configure the global tracing subscriber.
    ///
    /// The `name` serves as the primary identifier for your logs and is used
    /// as a prefix for rolling log files (e.g., `my-app.2025-10-27.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            config: LoggerConfig::default(),
            name: NoName,
            file_state: std::marker::PhantomData,
        }
    }

    /// Initializes the global subscriber from a deserialized [`LoggingConfig`].
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] if `level` is not a level name or the
    ///   config enables no output at all.
    /// * Everything [`LoggerBuilder::init`] returns.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LoggerError> {
        let level = config.level.trim().parse::<LevelFilter>().map_err(|e| {
            LoggerError::invalid(format!("Invalid log level '{}': {e}", config.level))
        })?;

        let mut builder =
            Self::builder().name(config.name.as_str()).console(config.console).level(level);
        if let Some(audit) = &config.audit_directory {
            builder = builder.audit_path(audit);
        }

        match &config.directory {
            Some(directory) => {
                let builder = builder.path(directory).max_files(config.max_files);
                if config.json { builder.json().init() } else { builder.init() }
            }
            None => builder.init(),
        }
    }

    /// Best-effort synchronization point before shutdown.
    ///
    /// Pending lines are written when the guards drop; this only marks the point in the log.
    pub fn flush(&self) {
        tracing::debug!(writers = self.guards.len(), "Logger flushed");
    }

    /// Number of background file writers (main log and audit trail).
    #[must_use]
    pub const fn writers(&self) -> usize {
        self.guards.len()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if !self.guards.is_empty() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn is_audit_event(meta: &Metadata<'_>) -> bool {
    meta.is_event() && meta.target() == AUDIT_TARGET
}

fn rolling_writer(
    config: &LoggerConfig,
    path: &Path,
    name: &str,
    suffix: &str,
) -> Result<(NonBlocking, WorkerGuard), LoggerError> {
    fs::create_dir_all(path).map_err(|e| LoggerError::Internal {
        message: e.to_string().into(),
        context: Some(format!("Failed to create path: {}", path.display()).into()),
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(config.rotation.clone())
        .filename_prefix(name)
        .filename_suffix(suffix)
        .max_log_files(config.max_files)
        .build(path)?;

    Ok(tracing_appender::non_blocking(appender))
}

fn validate_config(config: &LoggerConfig, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::invalid("Logger name cannot be empty"));
    }

    if config.max_files == 0 {
        return Err(LoggerError::invalid("max_files must be greater than zero"));
    }

    if let (Some(main), Some(audit)) = (&config.path, &config.audit_path)
        && main == audit
    {
        return Err(LoggerError::InvalidConfiguration {
            message: "Audit trail must not share the main log directory".into(),
            context: Some(audit.display().to_string().into()),
        });
    }

    Ok(())
}

fn build_env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    config.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| {
                LoggerError::invalid(format!("Invalid env filter '{filter}': {e}"))
            })
        },
    )
}
