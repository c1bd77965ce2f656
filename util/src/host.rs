//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{env, path::PathBuf};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The environment variable pointing at the software root, which contains the
/// `params` and `sessions` directories.
pub const ROOT_ENV_VAR: &str = "BEZIER_NAV_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_nav_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(ROOT_ENV_VAR).map(PathBuf::from)
}
