//! Tracing configuration for the command-line front end
//!
//! The library only emits events; subscribers are installed here, by the
//! binary, following the usual split between applications and libraries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

impl TracingFormat {
    /// Parse a `--log-format` value
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "console" | "pretty" => Ok(Self::Console),
            "compact" => Ok(Self::Compact),
            #[cfg(feature = "tracing-json")]
            "json" => Ok(Self::Json),
            #[cfg(not(feature = "tracing-json"))]
            "json" => anyhow::bail!("JSON logging requires the tracing-json feature"),
            other => anyhow::bail!(
                "Unknown log format '{}' (expected console, compact or json)",
                other
            ),
        }
    }
}

/// Configuration for tracing output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Output to both console and a daily-rolled file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

impl TracingOutput {
    /// Destination for an optional `--log-file`
    pub fn for_log_file(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        match path {
            None => Ok(Self::Console),
            #[cfg(feature = "tracing-files")]
            Some(path) => Ok(Self::File(path.to_path_buf())),
            #[cfg(not(feature = "tracing-files"))]
            Some(path) => anyhow::bail!(
                "Logging to {} requires the tracing-files feature",
                path.display()
            ),
        }
    }
}

/// Keeps background writers alive; drop it only at process exit
#[must_use = "dropping the guard stops file logging"]
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for request correlation
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn console_layer<S>(format: TracingFormat) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        use tracing_subscriber::fmt;

        match format {
            TracingFormat::Console => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .with_level(true)
                .compact()
                .boxed(),
            TracingFormat::Compact => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .compact()
                .boxed(),
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        }
    }

    /// Install the global subscriber
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(self.verbosity_to_filter()))?,
        };

        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();
        let registry = Registry::default().with(filter);

        match &self.output {
            TracingOutput::Console => {
                registry.with(Self::console_layer(self.format)).try_init()?;
            },

            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) | TracingOutput::Both(path) => {
                use tracing_subscriber::fmt;

                let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
                let appender = if matches!(self.output, TracingOutput::Both(_)) {
                    tracing_appender::rolling::daily(
                        dir,
                        path.file_stem()
                            .unwrap_or_else(|| std::ffi::OsStr::new("dermascan")),
                    )
                } else {
                    tracing_appender::rolling::never(
                        dir,
                        path.file_name()
                            .unwrap_or_else(|| std::ffi::OsStr::new("dermascan.log")),
                    )
                };
                let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
                guard._file = Some(file_guard);

                #[cfg(feature = "tracing-json")]
                let file_layer = fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .boxed();
                #[cfg(not(feature = "tracing-json"))]
                let file_layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_writer)
                    .compact()
                    .boxed();

                let console = matches!(self.output, TracingOutput::Both(_))
                    .then(|| Self::console_layer(self.format));
                registry.with(console).with(file_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Skin analysis session started");
        }

        Ok(guard)
    }
}

/// Initialize tracing for the CLI
pub fn init_cli_tracing(
    verbosity: u8,
    session_id: &str,
    format: TracingFormat,
    output: TracingOutput,
) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_output(output)
        .with_session_id(session_id)
        .init()
}

/// Span creation helpers for the CLI stages
pub mod spans {
    use tracing::{Level, Span};

    /// Span for the entire CLI run
    pub fn session(session_id: &str, api_url: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            api_url = %api_url
        )
    }

    /// Span for loading and cropping one photograph
    pub fn image_processing(file_path: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "image_processing",
            file_path = %file_path.display()
        )
    }

    /// Span for report generation and download
    pub fn report(patient: Option<&str>) -> Span {
        tracing::span!(
            Level::INFO,
            "report",
            has_patient = patient.is_some()
        )
    }
}
