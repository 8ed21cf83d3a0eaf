use std::ffi::OsString;
use std::fmt::{self as stdfmt, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gsn_config::{LogFormat, LoggingConfig};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::NonBlocking;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ---------------------------------------------------------------------------
// FileFields
// ---------------------------------------------------------------------------

/// Field formatter for the file layer. A distinct type keeps its cached span
/// fields apart from the console layer's (which may carry ANSI codes).
#[derive(Default)]
pub struct FileFields(DefaultFields);

impl<'writer> FormatFields<'writer> for FileFields {
    fn format_fields<R: tracing_subscriber::field::RecordFields>(
        &self,
        writer: Writer<'writer>,
        fields: R,
    ) -> stdfmt::Result {
        self.0.format_fields(writer, fields)
    }
}

// ---------------------------------------------------------------------------
// DomainFormat
// ---------------------------------------------------------------------------

/// Plain-text event format with the `domain` field lifted into a prefix:
///
/// ```text
/// 2026-10-17T08:00:00Z  INFO [sys] runtime started wrappers=2 sources=5
/// ```
pub struct DomainFormat {
    timer: SystemTime,
}

impl DomainFormat {
    pub fn new() -> Self {
        Self { timer: SystemTime }
    }
}

impl Default for DomainFormat {
    fn default() -> Self {
        Self::new()
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "31",
        Level::WARN => "33",
        Level::INFO => "32",
        Level::DEBUG => "34",
        Level::TRACE => "35",
    }
}

/// Write `text` wrapped in the SGR code `sgr` when the writer renders ANSI.
fn styled(writer: &mut Writer<'_>, sgr: &str, text: impl stdfmt::Display) -> stdfmt::Result {
    if writer.has_ansi_escapes() {
        write!(writer, "\x1b[{sgr}m{text}\x1b[0m")
    } else {
        write!(writer, "{text}")
    }
}

impl<S, N> FormatEvent<S, N> for DomainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let mut stamp = String::new();
        if self.timer.format_time(&mut Writer::new(&mut stamp)).is_err() {
            stamp.push_str("<unknown time>");
        }
        styled(&mut writer, "2", &stamp)?;

        let level = *event.metadata().level();
        write!(writer, " ")?;
        styled(&mut writer, level_color(level), format_args!("{level:>5}"))?;
        write!(writer, " ")?;

        let mut fields = EventFields::default();
        event.record(&mut fields);

        if let Some(domain) = &fields.domain {
            styled(&mut writer, "1;36", format_args!("[{domain}]"))?;
            write!(writer, " ")?;
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                styled(&mut writer, "1", span.name())?;
                write!(writer, "{{")?;
                if let Some(formatted) = span.extensions().get::<FormattedFields<N>>() {
                    write!(writer, "{formatted}")?;
                }
                write!(writer, "}}: ")?;
            }
        }

        write!(writer, "{}", fields.message)?;
        if !fields.rest.is_empty() {
            write!(writer, " ")?;
            styled(&mut writer, "3", &fields.rest)?;
        }
        writeln!(writer)
    }
}

// ---------------------------------------------------------------------------
// EventFields
// ---------------------------------------------------------------------------

/// Splits an event's fields into domain, message and `key=value` rest.
#[derive(Default)]
struct EventFields {
    domain: Option<String>,
    message: String,
    rest: String,
}

impl EventFields {
    fn push(&mut self, name: &str, value: impl stdfmt::Display) {
        if !self.rest.is_empty() {
            self.rest.push(' ');
        }
        let _ = write!(self.rest, "{name}={value}");
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "domain" => self.domain = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.push(name, format_args!("{value:?}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        match field.name() {
            "domain" => self.domain = Some(format!("{value:?}").trim_matches('"').to_string()),
            "message" => {
                let _ = write!(self.message, "{value:?}");
            }
            name => self.push(name, format_args!("{value:?}")),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field.name(), value);
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    let directives = config.directives();
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{directives}'"))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Plain => fmt::layer()
            .event_format(DomainFormat::new())
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .fmt_fields(FileFields::default())
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Plain => fmt::layer()
            .event_format(DomainFormat::new())
            .fmt_fields(FileFields::default())
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// Split the configured log file into (directory, file name), resolving a
/// relative path against `base_dir` and creating the directory.
fn log_file_target(file: &Path, base_dir: &Path) -> Result<(PathBuf, OsString)> {
    let resolved = if file.is_relative() {
        base_dir.join(file)
    } else {
        file.to_path_buf()
    };
    let name = resolved
        .file_name()
        .with_context(|| format!("log file {} has no file name", resolved.display()))?
        .to_os_string();
    let dir = resolved
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    Ok((dir, name))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Install the global subscriber described by `[logging]`.
///
/// Console output always goes to stderr; `file` adds a non-blocking file
/// writer whose [`WorkerGuard`] must be held until exit. `RUST_LOG`
/// replaces the configured directives. `log` records from `gsn-core` are
/// bridged by `tracing-subscriber`'s `tracing-log` feature.
pub fn init_tracing(config: &LoggingConfig, base_dir: &Path) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;
    let mut layers = vec![console_layer(config.format, filter)];

    let guard = match &config.file {
        Some(file) => {
            let (dir, name) = log_file_target(file, base_dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            layers.push(file_layer(config.format, writer));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("a global tracing subscriber is already installed")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_joins_module_overrides() {
        let mut config = LoggingConfig::default();
        config.level = "warn".into();
        config.modules.insert("gsn_core::sliding".into(), "debug".into());
        if std::env::var("RUST_LOG").is_err() {
            let filter = build_filter(&config).unwrap();
            assert!(filter.to_string().contains("gsn_core::sliding=debug"));
        }
    }

    #[test]
    fn relative_log_file_lands_under_base_dir() {
        let base = tempfile::tempdir().unwrap();
        let (dir, name) = log_file_target(Path::new("logs/gsn.log"), base.path()).unwrap();
        assert_eq!(dir, base.path().join("logs"));
        assert_eq!(name, OsString::from("gsn.log"));
        assert!(dir.is_dir());
    }
}
