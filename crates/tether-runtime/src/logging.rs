//! Subscriber installation from [`LoggingConfig`].
//!
//! The dispatcher opens one span per engine event and one per hook tier, so
//! turning on `span_events.new`/`close` is the quickest way to see which
//! plugins an event reached. `RUST_LOG`, when set, replaces the configured
//! base level; per-target `filters` still apply on top.
//!
//! ```rust,ignore
//! let config = tether_runtime::load_config()?;
//! tether_runtime::logging::init_from_config(&config.logging);
//! ```

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

const DEFAULT_FILE_NAME: &str = "tether.log";

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed is left in place.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Subscriber setup: a [`LoggingConfig`] plus extra filter directives.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
}

impl LoggingBuilder {
    /// Starts from the default logging settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from `config`.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            directives: Vec::new(),
        }
    }

    /// Adds a filter directive such as `tether_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Filter directives in the order they are applied.
    fn directives(&self) -> Vec<String> {
        let mut configured: Vec<String> = self
            .config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={}", level.to_lowercase()))
            .collect();
        configured.sort();
        configured.extend(self.directives.iter().cloned());
        configured
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.to_lowercase()));
        for directive in self.directives() {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => eprintln!("Ignoring log directive {directive:?}: {e}"),
            }
        }
        filter
    }

    fn writer(&self) -> BoxMakeWriter {
        match (self.config.output, self.config.file_path.as_deref()) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => match self.file_appender(path) {
                Ok(appender) => BoxMakeWriter::new(appender),
                Err(e) => {
                    eprintln!("Cannot open log file {} ({e}); using stdout", path.display());
                    BoxMakeWriter::new(std::io::stdout)
                }
            },
            (LogOutput::File, None) => {
                eprintln!("Log output is `file` but no file_path is set; using stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn file_appender(&self, path: &Path) -> Result<RollingFileAppender, InitError> {
        let rotation = match self.config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_FILE_NAME);
        let mut builder = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(name);
        if self.config.max_files > 0 {
            builder = builder.max_log_files(self.config.max_files);
        }
        builder.build(path.parent().unwrap_or_else(|| Path::new(".")))
    }

    fn format_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(self.writer())
            .with_span_events(fmt_span(&self.config.span_events))
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);
        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.compact().boxed(),
        }
    }

    /// Installs the subscriber.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.format_layer())
            .with(self.filter())
            .try_init()
    }
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(on, _)| *on)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_from_filters_then_extra() {
        let mut config = LoggingConfig::default();
        config
            .filters
            .insert("tether_framework".into(), "Trace".into());
        config.filters.insert("tether_core".into(), "WARN".into());

        let builder = LoggingBuilder::from_config(&config).directive("tether_runtime=debug");
        assert_eq!(
            builder.directives(),
            vec![
                "tether_core=warn",
                "tether_framework=trace",
                "tether_runtime=debug",
            ]
        );
    }

    #[test]
    fn test_span_events_map_to_fmt_span() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
    }
}
