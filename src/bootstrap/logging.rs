use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::bootstrap::config::{Config, LogFormat, Rollover};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub type LogSubscriber = Layered<EnvFilter, Layered<Vec<BoxedLayer>, Registry>>;

/// Keeps the rotated-file writer flushing; hold it for the life of the process.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Debug runs log to stdout; everything else goes to stderr.
pub fn console_target(cfg: &Config) -> ConsoleTarget {
    if cfg.debug {
        ConsoleTarget::Stdout
    } else {
        ConsoleTarget::Stderr
    }
}

pub fn init_logging(cfg: &Config) -> anyhow::Result<LogGuard> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (subscriber, guard) = match console_target(cfg) {
        ConsoleTarget::Stdout => build_subscriber(cfg, std::io::stdout, rust_log.as_deref())?,
        ConsoleTarget::Stderr => build_subscriber(cfg, std::io::stderr, rust_log.as_deref())?,
    };
    subscriber.try_init()?;
    warn_unsupported_rotation(cfg);
    Ok(guard)
}

/// Builds the subscriber without installing it. `console` receives the
/// console output; `rust_log` overrides the configured level.
pub fn build_subscriber<W>(
    cfg: &Config,
    console: W,
    rust_log: Option<&str>,
) -> anyhow::Result<(LogSubscriber, LogGuard)>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let default_directives = format!(
        "{},sqlx=warn,tower_http=info",
        cfg.effective_log_level()
    );
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives));

    let mut layers: Vec<BoxedLayer> = vec![format_layer(cfg.log_format, console, cfg.debug)];

    let mut file_guard = None;
    if cfg.enable_time_rotate {
        let (dir, prefix) = split_log_path(&cfg.filename);
        let mut builder = RollingFileAppender::builder()
            .rotation(rotation_for(cfg.rollover))
            .filename_prefix(prefix);
        if cfg.backup_count > 0 {
            builder = builder.max_log_files(cfg.backup_count);
        }
        let appender = builder.build(&dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(cfg.log_format, writer, false));
        file_guard = Some(guard);
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    Ok((subscriber, LogGuard { _file: file_guard }))
}

pub fn warn_unsupported_rotation(cfg: &Config) {
    if !cfg.enable_time_rotate {
        return;
    }
    if cfg.interval > 1 {
        tracing::warn!(
            interval = cfg.interval,
            rollover = ?cfg.rollover,
            "log rotation interval > 1 is not supported, rotating every period"
        );
    }
    if matches!(cfg.rollover, Rollover::Seconds) {
        tracing::warn!("per-second log rotation is not supported, rotating every minute");
    }
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

pub fn rotation_for(rollover: Rollover) -> Rotation {
    match rollover {
        Rollover::Seconds | Rollover::Minutes => Rotation::MINUTELY,
        Rollover::Hours => Rotation::HOURLY,
        Rollover::Days | Rollover::Midnight | Rollover::Weekday(_) => Rotation::DAILY,
    }
}

/// Splits `logs/vista.log` into the directory and the file name prefix.
pub fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vista.log".to_string());
    (dir, prefix)
}
