//! # Genetic optimizer module
//!
//! Searches for a Bezier path between a fixed start and end point that keeps
//! away from danger while staying short. Each candidate path is a
//! [`Chromosome`], an ordered list of control points whose first and last
//! genes are the fixed start and end. The interior genes, and how many of them
//! there are, evolve.
//!
//! One generation runs:
//!  1. Evaluate - score every chromosome (lower is better) from its
//!     normalised length and the danger sampled along its curve.
//!  1. Select elites - the best scoring fraction is protected from crossover.
//!  1. Crossover - random pairs of non-elites swap tails at a random cut.
//!  1. Mutate - random chromosomes have an interior gene edited, inserted or
//!     deleted.
//!  1. Validate - chromosomes whose curves pass through an obstacle are
//!     removed, and the population is optionally refilled.
//!
//! The [`GaRunner`] repeats this for a number of generations, tracking the
//! best chromosome and writing it to a [`checkpoint`] file from which the
//! tracking phase is later seeded.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod checkpoint;
pub mod chromosome;
pub mod fitness;
pub mod params;
pub mod population;
pub mod runner;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use checkpoint::{CheckpointEntry, CheckpointError, CheckpointWriter};
pub use chromosome::*;
pub use fitness::*;
pub use params::{GaParams, RespawnPolicy};
pub use population::*;
pub use runner::*;

use crate::geom::GeomError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the genetic optimizer.
#[derive(Debug, thiserror::Error)]
pub enum GaError {
    #[error("Invalid GA parameters: {0}")]
    InvalidParams(String),

    /// Fitness normalisation needs at least one chromosome.
    #[error("Cannot evaluate an empty population")]
    EmptyPopulation,

    /// Every curve in the population has zero length, so lengths can't be
    /// normalised.
    #[error("Maximum path length in the population is zero")]
    DivisionByZero,

    /// An operator needing interior genes was applied to a chromosome that is
    /// too short.
    #[error("Chromosome of length {len} is too short, at least {min} genes are needed")]
    InvalidGenomeLength { len: usize, min: usize },

    /// Elite selection or an operator was used with fitness scores or an
    /// elite set that no longer match the population.
    #[error("Stale population data: {0}")]
    Stale(String),

    /// The run stopped before any generation was scored, so there is no best
    /// chromosome.
    #[error("No generation was evaluated")]
    NotEvaluated,

    #[error("Geometry error: {0}")]
    Geom(#[from] GeomError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}
