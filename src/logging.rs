//! Tracing setup: console output plus the two append-only log files.
//!
//! The console honours `RUST_LOG` (or `--verbose`) and can emit JSON. The
//! info file is the trade journal (INFO events from this crate only),
//! the error file collects aborts and failures (WARN and above). Both prefix
//! each line with a `YYYY MM DD HH:MM:SS` UTC timestamp.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{Level, Metadata};
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::fmt::time::{FormatTime, UtcTime};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::BotError;

/// Timestamp layout of the log files.
pub const LOG_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year] [month] [day] [hour]:[minute]:[second]");

/// Install the global subscriber.
pub fn init(config: &Config, verbose: bool) -> Result<(), BotError> {
    let info_file = open_append(&config.info_log)?;
    let error_file = open_append(&config.error_log)?;

    let console = if config.log_json {
        fmt::layer()
            .json()
            .with_filter(console_filter(config, verbose))
            .boxed()
    } else {
        fmt::layer()
            .with_filter(console_filter(config, verbose))
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(info_file))
                .with_ansi(false)
                .with_timer(log_timer())
                .with_target(false)
                .with_level(false)
                .with_filter(filter_fn(is_journal_event)),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(error_file))
                .with_ansi(false)
                .with_timer(log_timer())
                .with_target(false)
                .with_level(false)
                .with_filter(LevelFilter::WARN),
        )
        .try_init()
        .map_err(|e| BotError::Logging(e.to_string()))
}

fn console_filter(config: &Config, verbose: bool) -> EnvFilter {
    if verbose || config.verbose {
        EnvFilter::new("exchange_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    }
}

fn log_timer() -> impl FormatTime {
    UtcTime::new(LOG_TIME_FORMAT)
}

fn is_journal_event(metadata: &Metadata<'_>) -> bool {
    *metadata.level() == Level::INFO && metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
}

fn open_append(path: impl AsRef<Path>) -> Result<File, BotError> {
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?)
}
