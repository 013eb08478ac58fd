use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target used by the operator-facing activity log.
pub const ACTIVITY_TARGET: &str = "activity";

/// Installs the global subscriber.
///
/// - file: hourly rolling `logs/app.*`, INFO for [`ACTIVITY_TARGET`], WARN for the rest
/// - console: ERROR only, unless `console_activity` is set (headless runs), in which
///   case the activity target is echoed at INFO as well
///
/// The returned guard flushes the file writer and MUST be kept alive by the caller.
pub fn setup_logger(console_activity: bool) -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", "app");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(ACTIVITY_TARGET, Level::DEBUG)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = if console_activity {
        tracing_subscriber::filter::Targets::new()
            .with_target(ACTIVITY_TARGET, Level::INFO)
            .with_default(Level::ERROR)
    } else {
        tracing_subscriber::filter::Targets::new()
            .with_target(ACTIVITY_TARGET, tracing_subscriber::filter::LevelFilter::OFF)
            .with_default(Level::ERROR)
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

// --- Formatters ---

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);
    visitor.message
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);

        let style = match *event.metadata().level() {
            Level::ERROR => Style::new().fg(Color::LightRed),
            Level::WARN => Style::new().fg(Color::LightMagenta),
            Level::DEBUG | Level::TRACE => Style::new().fg(Color::LightBlue),
            Level::INFO if msg.contains("Successfully") || msg.contains("success") => {
                Style::new().fg(Color::LightGreen)
            }
            Level::INFO => Style::new().fg(Color::White),
        };

        writeln!(
            writer,
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            style.paint(msg)
        )
    }
}

/// `2024-01-31 12:00:00 INFO  activity | message`; the target column separates the
/// operator activity stream from library diagnostics.
pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        writeln!(
            writer,
            "{} {:<5} {} | {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            meta.level(),
            meta.target(),
            event_message(event)
        )
    }
}
