//! Run sessions
//!
//! A session is a single run of an executable. Each session gets its own
//! directory, named after the executable and the time it started, holding the
//! log file, the `arch` directory used for CSV archives, and any JSON reports
//! saved during the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Start time of the first session in this process.
static EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Session directory suffix, e.g. `ga_plan_20240131_174502`.
const DIR_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Output locations of one run.
#[derive(Clone, Debug)]
pub struct Session {
    pub session_root: PathBuf,

    /// CSV archives go here
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("BEZIER_NAV_ROOT is not set, can't locate the sessions directory")]
    RootNotSet,

    #[error("Cannot create {0:?}: {1}")]
    CreateDir(PathBuf, io::Error),

    #[error("Cannot write {0:?}: {1}")]
    WriteFile(PathBuf, io::Error),

    #[error("Cannot serialise data for {0:?}: {1}")]
    Serialise(PathBuf, serde_json::Error),

    #[error("Reports must be saved as .json, got {0:?}")]
    UnsupportedExtension(PathBuf),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a session under `$BEZIER_NAV_ROOT/<sessions_dir>`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_nav_sw_root().map_err(|_| SessionError::RootNotSet)?;

        Self::in_dir(exec_name, root.join(sessions_dir))
    }

    /// Start a session in `<sessions_dir>/<exec_name>_<timestamp>`.
    pub fn in_dir<P: AsRef<Path>>(exec_name: &str, sessions_dir: P) -> Result<Self, SessionError> {
        // Later sessions in the same process share the first one's epoch
        let epoch = EPOCH.get_or_init(Utc::now);

        let session_root = sessions_dir
            .as_ref()
            .join(format!("{}_{}", exec_name, epoch.format(DIR_TIMESTAMP)));
        let arch_root = session_root.join("arch");

        fs::create_dir_all(&arch_root).map_err(|e| SessionError::CreateDir(arch_root.clone(), e))?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
        })
    }

    /// Write `data` as pretty JSON to a path relative to the session root.
    pub fn save<P: AsRef<Path>, T: Serialize>(&self, path: P, data: &T) -> Result<(), SessionError> {
        let full_path = self.session_root.join(path);

        if full_path.extension().and_then(|s| s.to_str()) != Some("json") {
            return Err(SessionError::UnsupportedExtension(full_path));
        }

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::CreateDir(parent.to_path_buf(), e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&full_path)
            .map_err(|e| SessionError::WriteFile(full_path.clone(), e))?;

        serde_json::to_writer_pretty(&file, data)
            .map_err(|e| SessionError::Serialise(full_path.clone(), e))?;

        debug!("Saved {:?}", full_path);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the first session of this process started, `None` before
/// any session exists.
pub fn elapsed_seconds() -> Option<f64> {
    EPOCH
        .get()
        .and_then(|epoch| time::duration_to_seconds(Utc::now() - *epoch))
}

/// Start time of the first session of this process.
pub fn epoch() -> Option<&'static DateTime<Utc>> {
    EPOCH.get()
}
