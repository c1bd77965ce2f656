//! Generation loop driving the optimizer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;

use super::{Chromosome, CheckpointWriter, GaError, GaParams, Population};
use crate::map::Terrain;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs the genetic optimizer over a terrain.
pub struct GaRunner {
    params: GaParams,

    /// Set by another thread to stop the run between generations
    cancel: Option<Arc<AtomicBool>>,

    checkpoint: Option<CheckpointWriter>,
}

/// Statistics recorded for each generation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GenerationStats {
    pub generation: usize,

    /// Population size when the generation was evaluated
    pub population: usize,

    /// Whether scoring was skipped because the population couldn't be
    /// evaluated
    pub skipped: bool,

    pub best_fitness: f64,
    pub mean_fitness: f64,

    /// Number of chromosomes given the danger penalty
    pub penalised: usize,

    pub elites: usize,
    pub crossovers: usize,
    pub mutations: usize,

    /// Chromosomes removed by validation
    pub removed: usize,

    /// Chromosomes added by the respawn policy
    pub respawned: usize,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct GaReport {
    /// Best chromosome seen over the whole run
    pub best: Chromosome,

    pub best_fitness: f64,

    /// Generation in which the best chromosome was found
    pub best_generation: usize,

    /// Number of generations run
    pub generations: usize,

    /// Whether the run was stopped by the cancel flag
    pub cancelled: bool,

    pub history: Vec<GenerationStats>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaRunner {
    pub fn new(params: GaParams) -> Result<Self, GaError> {
        params.validate()?;

        Ok(Self {
            params,
            cancel: None,
            checkpoint: None,
        })
    }

    /// Stop the run between generations once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Write the best chromosomes to a checkpoint as the run goes.
    pub fn with_checkpoint(mut self, writer: CheckpointWriter) -> Self {
        self.checkpoint = Some(writer);
        self
    }

    pub fn params(&self) -> &GaParams {
        &self.params
    }

    /// Run the optimizer.
    ///
    /// `on_generation` is called with the statistics of every generation as
    /// it completes. The run stops after `num_generations`, when the cancel
    /// flag is set, or when the population is empty and can't be refilled.
    /// The overall best is written to the checkpoint when the run stops.
    pub fn run<R, F>(
        &mut self,
        terrain: &Terrain,
        rng: &mut R,
        mut on_generation: F,
    ) -> Result<GaReport, GaError>
    where
        R: Rng,
        F: FnMut(&GenerationStats),
    {
        let mut population = Population::new(self.params.clone(), terrain.extent)?;
        population.initialise(rng);

        let removed = population.validate(&terrain.obstacles);
        let respawned = population.repair(&terrain.obstacles, rng);
        info!(
            "Initial population of {} ({} invalid, {} respawned)",
            population.len(),
            removed,
            respawned
        );

        let mut best: Option<(Chromosome, f64, usize)> = None;
        let mut history = Vec::new();
        let mut cancelled = false;

        for generation in 0..self.params.num_generations {
            if self.is_cancelled() {
                info!("Run cancelled before generation {}", generation);
                cancelled = true;
                break;
            }

            let mut stats = GenerationStats {
                generation,
                population: population.len(),
                ..GenerationStats::default()
            };

            // ---- EVALUATE ----

            match population.evaluate(&terrain.danger) {
                Ok(()) => (),
                Err(e @ GaError::EmptyPopulation) | Err(e @ GaError::DivisionByZero) => {
                    warn!("Skipping generation {}: {}", generation, e);
                    stats.skipped = true;
                    stats.respawned = population.repair(&terrain.obstacles, rng);

                    on_generation(&stats);
                    history.push(stats);

                    if population.is_empty() {
                        warn!("Population is empty and can't be refilled, stopping");
                        break;
                    }
                    continue;
                }
                Err(e) => return Err(e),
            }

            let fitness = population.fitness().unwrap_or(&[]);
            stats.mean_fitness = fitness.iter().sum::<f64>() / fitness.len().max(1) as f64;
            stats.penalised = fitness
                .iter()
                .filter(|&&f| f >= self.params.danger_penalty)
                .count();

            if let Some((gen_best, gen_best_fitness)) = population.best() {
                stats.best_fitness = gen_best_fitness;

                if best.as_ref().map_or(true, |b| gen_best_fitness < b.1) {
                    debug!(
                        "New best fitness {:.6} in generation {}",
                        gen_best_fitness, generation
                    );
                    best = Some((gen_best.clone(), gen_best_fitness, generation));
                }

                if self.params.checkpoint_interval > 0
                    && generation % self.params.checkpoint_interval == 0
                {
                    if let Some(ref mut writer) = self.checkpoint {
                        writer.append(generation, gen_best)?;
                    }
                }
            }

            // ---- BREED ----

            let elites = population.select_elites()?;
            stats.elites = elites.len();
            stats.crossovers = population.crossover(&elites, rng)?.pairs;
            stats.mutations = population.mutate(elites, rng)?.total();

            // ---- VALIDATE ----

            stats.removed = population.validate(&terrain.obstacles);
            stats.respawned = population.repair(&terrain.obstacles, rng);

            debug!(
                "Generation {}: best {:.6}, mean {:.6}, {} penalised, {} removed, {} respawned",
                generation,
                stats.best_fitness,
                stats.mean_fitness,
                stats.penalised,
                stats.removed,
                stats.respawned
            );

            on_generation(&stats);
            history.push(stats);
        }

        let (best, best_fitness, best_generation) = best.ok_or(GaError::NotEvaluated)?;

        let generations = history.len();
        if let Some(ref mut writer) = self.checkpoint {
            writer.append(generations, &best)?;
        }

        info!(
            "Run finished after {} generations{}, best fitness {:.6} from generation {}",
            generations,
            if cancelled { " (cancelled)" } else { "" },
            best_fitness,
            best_generation
        );

        Ok(GaReport {
            best,
            best_fitness,
            best_generation,
            generations,
            cancelled,
            history,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |c| c.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
