//! Logging configuration for jsonsql
//!
//! Sets up a `tracing` subscriber for the engine's events: query pipeline
//! stages and join downgrades at `debug`, table creation and removal at
//! `info`, file rewrites at `debug` and file reads at `trace`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// File name used when a log path has no file component
const DEFAULT_LOG_FILE: &str = "jsonsql.log";

/// Directive that enables per-stage query events
const QUERY_TRACE_DIRECTIVE: &str = "info,jsonsql_core::query=debug";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output destination
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a daily-rotated file
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// Single line per event
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives, `RUST_LOG` syntax; `RUST_LOG` itself wins if set
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Info level to stdout
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level for everything
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Info level, plus debug events from the query executor
    pub fn trace_queries() -> Self {
        Self::default().with_level(QUERY_TRACE_DIRECTIVE)
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set filter directives
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }

    /// Install the global subscriber described by this configuration
    ///
    /// Returns the file writer's guard when logging to a file; keep it alive
    /// for as long as events should be flushed. If a global subscriber is
    /// already installed it is left in place.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use jsonsql::logging::LogConfig;
    ///
    /// let _guard = LogConfig::trace_queries().init();
    /// ```
    pub fn init(self) -> Option<WorkerGuard> {
        let filter = self.filter();
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if matches!(self.output, LogOutput::Stdout | LogOutput::Both(_)) {
            layers.push(self.layer(std::io::stdout, true));
        }

        if let LogOutput::File(ref path) | LogOutput::Both(ref path) = self.output {
            let (directory, file_name) = split_log_path(path);
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            layers.push(self.layer(writer, false));
            guard = Some(worker_guard);
        }

        let _ = tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init();

        guard
    }
}

/// Directory and file name for the rolling appender
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (directory, file_name)
}
