// Logging setup: console output, optional JSON file output, and span timing
use dotenvy::dotenv;
use std::env;
use std::fs;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use eyre::Result;
use tracing::{Id, Subscriber, span, field::Field, field::Visit, debug};
use tracing_subscriber::{
    fmt,
    EnvFilter,
    layer::{SubscriberExt, Layer, Context},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

// Keeps the non-blocking file writer alive for the life of the process
static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const CRATE_TARGET: &str = "hotel_price_oracle";

/// Console/file log levels and whether to write a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub console_log_level: String,
    pub file_log_level: String,
    pub log_to_file: bool,
}

impl LogSettings {
    /// Reads the process environment after loading `.env`, if present
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            console_log_level: lookup("CONSOLE_LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            file_log_level: lookup("FILE_LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            log_to_file: lookup("LOG_TO_FILE").is_some_and(|v| v.trim() == "true"),
        }
    }
}

pub fn init_logging(bin_name: String) -> Result<()> {
    let settings = LogSettings::from_env();

    // Dependencies stay at warn, this crate and the running binary at the configured level
    let console_filter = crate_filter(&bin_name, &settings.console_log_level);
    let file_filter = crate_filter(&bin_name, &settings.file_log_level);

    let console_layer = fmt::Layer::new()
        .pretty()
        .with_filter(console_filter);

    if settings.log_to_file {
        let log_dir = std::path::Path::new("logs");
        fs::create_dir_all(log_dir)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H:%M:%S");
        let log_file_name = format!("{}_{}.log", bin_name, timestamp);

        let file_appender = tracing_appender::rolling::never(log_dir, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD.set(guard).ok();

        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(file_filter);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    }
    Ok(())
}

fn crate_filter(bin_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("warn,{}={},{}={}", CRATE_TARGET, level, bin_name, level))
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", CRATE_TARGET)))
}

/// Reports busy/idle/total time for spans declared with `on_close = true`
struct SpanTimingLayer;

struct SpanTimes {
    started: Instant,
    last_transition: Instant,
    busy: Duration,
    idle: Duration,
}

struct OnCloseVisitor {
    on_close: bool,
}

impl Visit for OnCloseVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "on_close" {
            self.on_close = value;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S> Layer<S> for SpanTimingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = OnCloseVisitor { on_close: false };
        attrs.record(&mut visitor);
        if !visitor.on_close {
            return;
        }
        if let Some(span) = ctx.span(id) {
            let now = Instant::now();
            span.extensions_mut().insert(SpanTimes {
                started: now,
                last_transition: now,
                busy: Duration::ZERO,
                idle: Duration::ZERO,
            });
        }
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(times) = span.extensions_mut().get_mut::<SpanTimes>() {
                times.idle += times.last_transition.elapsed();
                times.last_transition = Instant::now();
            }
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(times) = span.extensions_mut().get_mut::<SpanTimes>() {
                times.busy += times.last_transition.elapsed();
                times.last_transition = Instant::now();
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            if let Some(times) = span.extensions_mut().remove::<SpanTimes>() {
                debug!(
                    span = span.name(),
                    busy_time = ?times.busy,
                    idle_time = ?times.idle,
                    total_time = ?times.started.elapsed(),
                    "span closed"
                );
            }
        }
    }
}
