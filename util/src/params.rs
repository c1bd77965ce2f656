//! Parameter files
//!
//! Parameters are TOML files deserialised straight into the struct that uses
//! them. Executables load them from `$BEZIER_NAV_ROOT/params`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("BEZIER_NAV_ROOT is not set, can't locate the params directory")]
    RootNotSet,

    #[error("Cannot read parameter file {0:?}: {1}")]
    Read(PathBuf, io::Error),

    #[error("Invalid parameters: {0}")]
    Toml(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load `$BEZIER_NAV_ROOT/params/<file_name>`.
pub fn load<P: DeserializeOwned>(file_name: &str) -> Result<P, LoadError> {
    let root = crate::host::get_nav_sw_root().map_err(|_| LoadError::RootNotSet)?;

    load_path(root.join("params").join(file_name))
}

/// Load a parameter file from any path.
pub fn load_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    let contents = fs::read_to_string(path.as_ref())
        .map_err(|e| LoadError::Read(path.as_ref().to_path_buf(), e))?;

    from_str(&contents)
}

pub fn from_str<P: DeserializeOwned>(contents: &str) -> Result<P, LoadError> {
    toml::from_str(contents).map_err(LoadError::Toml)
}
