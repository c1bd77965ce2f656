//! Logging for the planner and tracker executables
//!
//! Records are written to stdout with coloured level tags and to the session's
//! log file as plain text. The level given by the executable can be overridden
//! at run time through the `BEZIER_NAV_LOG` environment variable, e.g.
//! `BEZIER_NAV_LOG=trace`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::{env, io, path::PathBuf};

use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable overriding the log level.
pub const LEVEL_ENV_VAR: &str = "BEZIER_NAV_LOG";

/// Prefix stripped from library targets to keep lines short.
const LIB_TARGET_PREFIX: &str = "nav_lib::";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("BEZIER_NAV_LOG is set to {0:?}, which isn't a log level")]
    InvalidLevel(String),

    #[error("Cannot open the log file {0:?}: {1}")]
    LogFile(PathBuf, io::Error),

    #[error("A logger has already been installed: {0}")]
    AlreadyInstalled(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise logging to stdout and the session log file.
///
/// `default_level` is used unless `BEZIER_NAV_LOG` names another level. Can
/// only succeed once per process.
pub fn logger_init(default_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    let level = parse_level(env::var(LEVEL_ENV_VAR).ok().as_deref(), default_level)?;

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(|e| LoggerInitError::LogFile(session.log_file_path.clone(), e))?;

    let terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::elapsed_seconds().unwrap_or(0.0),
                level_tag(record.level()),
                target_prefix(record),
                message
            ))
        })
        .chain(io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::elapsed_seconds().unwrap_or(0.0),
                level_code(record.level()),
                target_prefix(record),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(level)
        .level_for("rayon", level.min(LevelFilter::Warn))
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::AlreadyInstalled)?;

    info!("Logging initialised at {:?}", level);
    if let Some(epoch) = session::epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log file: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Level from the override string if there is one.
fn parse_level(
    value: Option<&str>,
    default_level: LevelFilter,
) -> Result<LevelFilter, LoggerInitError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default_level),
        Some(v) => v
            .parse()
            .map_err(|_| LoggerInitError::InvalidLevel(v.to_string())),
    }
}

/// Target shown before debug and trace messages.
fn target_prefix(record: &Record) -> String {
    if record.level() > Level::Info {
        let target = record.target();
        format!("{}: ", target.strip_prefix(LIB_TARGET_PREFIX).unwrap_or(target))
    }
    else {
        String::new()
    }
}

fn level_code(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn level_tag(level: Level) -> ColoredString {
    let code = level_code(level);
    match level {
        Level::Trace => code.dimmed().italic(),
        Level::Debug => code.dimmed(),
        Level::Info => code.normal(),
        Level::Warn => code.yellow(),
        Level::Error => code.red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
