//! Logging infrastructure
//!
//! - Console output, pretty for development or JSON for production
//! - Daily rotating application logs under `<log_dir>/app`
//! - Daily rotating security logs under `<log_dir>/security` (events with
//!   target `security`, e.g. rejected admin tokens)

use std::fs;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

const SECURITY_TARGET: &str = "security";

/// `RUST_LOG` wins over the configured level
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn console_layer<S>(level: &str, json_format: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(level_filter(level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(level_filter(level))
            .boxed()
    }
}

fn file_layers<S>(level: &str, log_dir: &Path) -> anyhow::Result<Vec<BoxedLayer<S>>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let app_log_dir = log_dir.join("app");
    let security_log_dir = log_dir.join("security");
    fs::create_dir_all(&app_log_dir)?;
    fs::create_dir_all(&security_log_dir)?;

    let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
    let app_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::sync::Mutex::new(app_log))
        .with_filter(level_filter(level))
        .with_filter(filter_fn(|meta| meta.target() != SECURITY_TARGET))
        .boxed();

    let security_log = RollingFileAppender::new(Rotation::DAILY, security_log_dir, "security");
    let security_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::sync::Mutex::new(security_log))
        .with_filter(filter_fn(|meta| meta.target() == SECURITY_TARGET))
        .boxed();

    Ok(vec![app_layer, security_layer])
}

/// Initialize console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Initialize logging, optionally with daily rotating files
///
/// # Arguments
/// * `level` - Log level (e.g. "info", "debug", "print_server=trace")
/// * `json_format` - JSON console output instead of the pretty format
/// * `log_dir` - Directory for file logging; `None` logs to the console only
///
/// # Examples
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// // Development setup (console only)
/// print_server::init_logger_with_file("debug", false, None)?;
/// # Ok(())
/// # }
/// ```
///
/// Fails when the log directories cannot be created or a global subscriber
/// is already installed.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer<Registry>> = vec![console_layer(level, json_format)];
    if let Some(dir) = log_dir {
        layers.extend(file_layers(level, Path::new(dir))?);
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}
