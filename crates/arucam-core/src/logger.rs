//! Stderr logging for the arucam binaries.
//!
//! Lines look like `[  1.234s  INFO arucam] message`: seconds since the
//! logger was installed, the level, and the crate that emitted the record.
//! Install it once at startup with [`init_with_level`], or with
//! `init_tracing` when the `tracing` feature is on.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// `arucam_opencv::capture` is reported as `arucam_opencv`.
fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

fn format_line(
    elapsed: f64,
    level: log::Level,
    target: &str,
    args: fmt::Arguments<'_>,
) -> String {
    format!("[{elapsed:7.3}s {level:>5} {}] {args}", crate_of(target))
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            *record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// `RUST_LOG` when set and valid, otherwise `fallback` for every target.
#[cfg(feature = "tracing")]
fn env_filter(fallback: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.as_str().to_ascii_lowercase()))
}

/// Install a `tracing` subscriber that also reports closed spans (per-frame
/// and per-marker timings). `RUST_LOG` overrides `fallback`.
#[cfg(feature = "tracing")]
pub fn init_tracing(fallback: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(tracing_subscriber::fmt::time::Uptime::default())
        .with_writer(std::io::stderr)
        .finish()
        .try_init();
}
