//! # Checkpoint files
//!
//! The optimizer saves chromosomes to a plain text checkpoint, one per line:
//!
//! ```text
//! Generation 12: 50 750 312 604 1180 95 1450 50
//! ```
//!
//! The values after the colon are the `x y` pairs of every gene, start and
//! end included. Coordinates are integers, a chromosome with a fractional
//! gene can't be written. Blank lines are skipped when loading. The tracking phase is
//! seeded from the last entry in the file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;

use super::Chromosome;
use crate::geom::Point2D;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const LABEL: &str = "Generation";

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One line of a checkpoint file.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointEntry {
    pub generation: usize,
    pub chromosome: Chromosome,
}

/// Appends entries to a checkpoint file as the optimizer runs.
#[derive(Debug)]
pub struct CheckpointWriter {
    path: PathBuf,
    file: File,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error on {0:?}: {1}")]
    Io(PathBuf, io::Error),

    #[error("Malformed checkpoint at line {line}: {reason}")]
    MalformedCheckpoint { line: usize, reason: String },

    #[error("Checkpoint {0:?} contains no entries")]
    NoEntries(PathBuf),

    #[error("Gene {index} ({x}, {y}) has non-integer coordinates and can't be checkpointed")]
    NonIntegerGene { index: usize, x: f64, y: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CheckpointEntry {
    pub fn new(generation: usize, chromosome: Chromosome) -> Self {
        Self {
            generation,
            chromosome,
        }
    }
}

impl CheckpointWriter {
    /// Open a checkpoint for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CheckpointError::Io(path.clone(), e))?;

        Ok(Self { path, file })
    }

    /// Append a chromosome to the checkpoint.
    pub fn append(
        &mut self,
        generation: usize,
        chromosome: &Chromosome,
    ) -> Result<(), CheckpointError> {
        let line = format_entry(generation, chromosome)?;

        writeln!(self.file, "{}", line)
            .and_then(|_| self.file.flush())
            .map_err(|e| CheckpointError::Io(self.path.clone(), e))?;

        debug!("Checkpointed generation {} to {:?}", generation, self.path);

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a single checkpoint line, without the trailing newline.
pub fn format_entry(generation: usize, chromosome: &Chromosome) -> Result<String, CheckpointError> {
    let mut values = Vec::with_capacity(chromosome.len() * 2);

    for (index, g) in chromosome.genes().iter().enumerate() {
        if !(is_exact_integer(g[0]) && is_exact_integer(g[1])) {
            return Err(CheckpointError::NonIntegerGene {
                index,
                x: g[0],
                y: g[1],
            });
        }
        values.push((g[0] as i64).to_string());
        values.push((g[1] as i64).to_string());
    }

    Ok(format!("{} {}: {}", LABEL, generation, values.join(" ")))
}

/// Format a whole checkpoint.
pub fn to_string(entries: &[CheckpointEntry]) -> Result<String, CheckpointError> {
    entries
        .iter()
        .map(|e| format_entry(e.generation, &e.chromosome).map(|l| l + "\n"))
        .collect()
}

/// Parse the contents of a checkpoint file.
pub fn parse(contents: &str) -> Result<Vec<CheckpointEntry>, CheckpointError> {
    let mut entries = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        let line_num = i + 1;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let malformed = |reason: String| CheckpointError::MalformedCheckpoint {
            line: line_num,
            reason,
        };

        let (label, values) = line
            .split_once(':')
            .ok_or_else(|| malformed("missing ':' after the generation label".into()))?;

        let generation = label
            .trim()
            .strip_prefix(LABEL)
            .and_then(|n| n.trim().parse::<usize>().ok())
            .ok_or_else(|| malformed(format!("expected \"{} <N>\", found {:?}", LABEL, label)))?;

        let values = values
            .split_whitespace()
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| malformed(format!("cannot parse {:?} as an integer: {}", v, e)))
            })
            .collect::<Result<Vec<i64>, CheckpointError>>()?;

        if values.len() % 2 != 0 {
            return Err(malformed(format!(
                "odd number of coordinates ({})",
                values.len()
            )));
        }

        let genes = values
            .chunks_exact(2)
            .map(|xy| Point2D::new(xy[0] as f64, xy[1] as f64))
            .collect();

        let chromosome = Chromosome::new(genes).map_err(|e| malformed(e.to_string()))?;

        entries.push(CheckpointEntry::new(generation, chromosome));
    }

    Ok(entries)
}

/// Load every entry of a checkpoint file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<CheckpointEntry>, CheckpointError> {
    let contents = fs::read_to_string(path.as_ref())
        .map_err(|e| CheckpointError::Io(path.as_ref().to_path_buf(), e))?;

    parse(&contents)
}

/// Load the last entry of a checkpoint file, the one tracking is seeded from.
pub fn load_best<P: AsRef<Path>>(path: P) -> Result<CheckpointEntry, CheckpointError> {
    load(path.as_ref())?
        .pop()
        .ok_or_else(|| CheckpointError::NoEntries(path.as_ref().to_path_buf()))
}

/// Write a checkpoint file, replacing any existing contents.
pub fn save<P: AsRef<Path>>(path: P, entries: &[CheckpointEntry]) -> Result<(), CheckpointError> {
    let contents = to_string(entries)?;

    fs::write(path.as_ref(), contents)
        .map_err(|e| CheckpointError::Io(path.as_ref().to_path_buf(), e))
}

fn is_exact_integer(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
