//! Logging setup for the card demo host.
//
// Console output is plain by default and colored under --verbose; everything
// also lands in a per-run log file under the app data directory.
//
// Usage:
//   Call `logging::init(verbose)` at the start of main().
//   Keep the returned guard alive for the program's duration.

use chrono::Local;
use directories::ProjectDirs;
use std::fs;
use tracing::Subscriber;
use tracing_subscriber::fmt::{
    format::{FormatEvent, FormatFields, Writer},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

#[allow(dead_code)]
pub struct LogGuard(tracing_appender::non_blocking::WorkerGuard);

/// Initializes logging for the demo host.
///
/// - `verbose`: If true, enables colored console output.
/// - Returns: LogGuard, which must be kept alive for file logging.
pub fn init(verbose: bool) -> LogGuard {
    // --- Logging directory setup ---
    let proj_dirs = ProjectDirs::from("com", "CardKit", "CardKit_Demo")
        .expect("Could not determine app data directory");
    let logs_dir = proj_dirs.data_dir().join("logs");
    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("failed to create logs directory: {e}");
    }
    let now = Local::now();
    let log_folder = logs_dir.join(format!("{}", now.format("%Y-%m-%d_%H-%M-%S")));
    if let Err(e) = fs::create_dir_all(&log_folder) {
        eprintln!("failed to create log timestamp folder: {e}");
    }
    let demo_log_path = log_folder.join("card_demo.log");

    let demo_log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&demo_log_path)
        .expect("Failed to open card_demo.log for writing");
    let (non_blocking, guard) = tracing_appender::non_blocking(demo_log_file);

    // The bridge crates log through the `log` facade; the subscriber's
    // log-compatibility layer (installed by `.init()`) routes those records
    // into tracing.
    use tracing_subscriber::prelude::*;
    let env_filter = match std::env::var("RUST_LOG").ok() {
        Some(val) => tracing_subscriber::EnvFilter::new(val),
        None => tracing_subscriber::EnvFilter::new("info"),
    };

    // File log: plain formatting, no ANSI codes
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    if verbose {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .event_format(ConsoleFormatter);
        registry.with(console_layer).init();
    } else {
        registry.init();
    }

    LogGuard(guard)
}

/// Compact colored formatter for console output.
pub struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let (level_str, level_color) = match *meta.level() {
            tracing::Level::ERROR => ("ERROR", "\x1b[1;91m"),
            tracing::Level::WARN => ("WARN ", "\x1b[1;93m"),
            tracing::Level::INFO => ("INFO ", "\x1b[1;94m"),
            tracing::Level::DEBUG => ("DEBUG", "\x1b[1;92m"),
            tracing::Level::TRACE => ("TRACE", "\x1b[1;95m"),
        };
        // Timestamp: dim cyan
        write!(writer, "\x1b[2;36m{}\x1b[0m ", Local::now().format("%H:%M:%S"))?;
        // Level: bold, colored, padded
        write!(writer, "{}{}\x1b[0m ", level_color, level_str)?;
        // Target: dim yellow
        write!(writer, "\x1b[2;33m{}\x1b[0m: ", meta.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
