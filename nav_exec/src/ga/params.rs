//! Genetic optimizer parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::GaError;
use crate::geom::Point2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the genetic optimizer
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GaParams {
    /// Fixed start of every path
    pub start: [f64; 2],

    /// Fixed end of every path
    pub end: [f64; 2],

    /// Number of chromosomes in the population
    pub population_size: usize,

    /// Number of genes (including start and end) of new chromosomes
    pub initial_length: usize,

    /// Number of generations to run for
    pub num_generations: usize,

    /// Weight of the normalised path length in the fitness
    pub length_weight: f64,

    /// Weight of the path danger in the fitness
    pub danger_weight: f64,

    /// Paths with a danger at or above this threshold get the penalty fitness
    pub danger_threshold: f64,

    /// Fitness given to paths above the danger threshold
    pub danger_penalty: f64,

    /// Fraction of the population protected from crossover
    pub elitism_ratio: f64,

    /// Fraction of the non-elites chosen as crossover parents
    pub crossover_ratio: f64,

    /// Probability that a chromosome is mutated in a generation
    pub mutation_ratio: f64,

    /// Whether mutation may be applied to elites
    pub mutate_elites: bool,

    /// Number of chords used to estimate path length
    pub length_samples: usize,

    /// Number of intervals the curve is split into when sampling danger
    pub danger_samples: usize,

    /// Coarse resolution used when projecting obstacle centres onto curves
    pub projection_resolution: usize,

    /// What to do when validation shrinks the population
    pub respawn_policy: RespawnPolicy,

    /// Attempts made to generate a valid chromosome for each respawned slot
    pub respawn_attempts: usize,

    /// Write the generation's best chromosome to the checkpoint every this
    /// many generations, 0 to only write at the end of the run
    pub checkpoint_interval: usize,

    /// Seed for the random number generator, random if not given
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the population is treated after validation removes chromosomes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RespawnPolicy {
    /// Refill the population to `population_size` with new random
    /// chromosomes which pass validation.
    Respawn,

    /// Leave the population smaller for the rest of the run.
    Shrink,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GaParams {
    fn default() -> Self {
        Self {
            start: [50.0, 750.0],
            end: [1450.0, 50.0],
            population_size: 200,
            initial_length: 5,
            num_generations: 10_000,
            length_weight: 0.2,
            danger_weight: 0.8,
            danger_threshold: 0.2,
            danger_penalty: 100.0,
            elitism_ratio: 0.3,
            crossover_ratio: 0.5,
            mutation_ratio: 0.1,
            mutate_elites: true,
            length_samples: 100,
            danger_samples: 100,
            projection_resolution: 100,
            respawn_policy: RespawnPolicy::Respawn,
            respawn_attempts: 100,
            checkpoint_interval: 1,
            seed: None,
        }
    }
}

impl GaParams {
    /// The fixed start position
    pub fn start(&self) -> Point2D {
        Point2D::new(self.start[0], self.start[1])
    }

    /// The fixed end position
    pub fn end(&self) -> Point2D {
        Point2D::new(self.end[0], self.end[1])
    }

    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), GaError> {
        if self.population_size == 0 {
            return Err(GaError::InvalidParams("population_size must be at least 1".into()));
        }

        if self.initial_length < 3 {
            return Err(GaError::InvalidParams(format!(
                "initial_length must be at least 3, found {}",
                self.initial_length
            )));
        }

        for (name, ratio) in [
            ("elitism_ratio", self.elitism_ratio),
            ("crossover_ratio", self.crossover_ratio),
            ("mutation_ratio", self.mutation_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(GaError::InvalidParams(format!(
                    "{} must be in [0, 1], found {}",
                    name, ratio
                )));
            }
        }

        if self.length_weight < 0.0
            || self.danger_weight < 0.0
            || (self.length_weight + self.danger_weight - 1.0).abs() > 1e-9
        {
            return Err(GaError::InvalidParams(format!(
                "length_weight ({}) and danger_weight ({}) must be non-negative and sum to 1",
                self.length_weight, self.danger_weight
            )));
        }

        if self.length_samples == 0 || self.danger_samples == 0 || self.projection_resolution == 0 {
            return Err(GaError::InvalidParams(
                "length_samples, danger_samples and projection_resolution must be non-zero".into(),
            ));
        }

        if self.start.iter().chain(self.end.iter()).any(|v| !v.is_finite()) {
            return Err(GaError::InvalidParams("start and end must be finite".into()));
        }

        // Checkpoints store integer coordinates
        if self.start.iter().chain(self.end.iter()).any(|v| v.fract() != 0.0) {
            return Err(GaError::InvalidParams(format!(
                "start {:?} and end {:?} must have integer coordinates",
                self.start, self.end
            )));
        }

        if self.start == self.end {
            return Err(GaError::InvalidParams("start and end must differ".into()));
        }

        Ok(())
    }
}
