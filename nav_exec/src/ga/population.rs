//! Population of chromosomes and the per-generation steps acting on it

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use rand::{seq::index, Rng};

// Internal
use super::{
    evaluate_fitness, has_free_gene, Chromosome, GaError, GaParams, MutationKind, RespawnPolicy,
};
use crate::{
    geom::Point2D,
    map::{DangerField, Obstacle},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The chromosomes of one generation together with their fitness.
#[derive(Debug, Clone)]
pub struct Population {
    params: GaParams,

    /// Area interior genes are drawn from
    extent: Point2D,

    chromosomes: Vec<Chromosome>,

    /// Fitness of each chromosome, by index. Empty when stale.
    fitness: Vec<f64>,

    /// Bumped whenever the fitness is recomputed or chromosome indices
    /// change. Elite sets remember the epoch they were selected in.
    epoch: u64,
}

/// The elites selected from a population in one generation.
///
/// An elite set can only be used with the population it was selected from,
/// and only until the population is next evaluated or validated.
#[derive(Debug, Clone)]
pub struct EliteSet {
    epoch: u64,

    /// Elite indices, best first
    indices: Vec<usize>,
}

/// Outcome of a crossover step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossoverReport {
    /// Number of pairs which produced children
    pub pairs: usize,

    /// Number of pairs skipped because a parent was too short
    pub skipped: usize,
}

/// Outcome of a mutation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub edits: usize,
    pub inserts: usize,
    pub deletes: usize,

    /// Number of deletes refused because the chromosome was too short
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Population {
    /// Create an empty population.
    pub fn new(params: GaParams, extent: Point2D) -> Result<Self, GaError> {
        params.validate()?;

        if !has_free_gene(extent, &params.start(), &params.end()) {
            return Err(GaError::InvalidParams(format!(
                "map extent ({}, {}) has no room for genes other than the start and end",
                extent[0], extent[1]
            )));
        }

        Ok(Self {
            params,
            extent,
            chromosomes: Vec::new(),
            fitness: Vec::new(),
            epoch: 0,
        })
    }

    /// Create a population from existing chromosomes.
    pub fn from_chromosomes(
        params: GaParams,
        extent: Point2D,
        chromosomes: Vec<Chromosome>,
    ) -> Result<Self, GaError> {
        let mut pop = Self::new(params, extent)?;
        pop.chromosomes = chromosomes;
        Ok(pop)
    }

    /// Replace the population with `population_size` random chromosomes of
    /// `initial_length` genes.
    pub fn initialise<R: Rng>(&mut self, rng: &mut R) {
        let (start, end) = (self.params.start(), self.params.end());
        let num_interior = self.params.initial_length - 2;

        self.chromosomes = (0..self.params.population_size)
            .map(|_| Chromosome::random(rng, start, end, num_interior, self.extent))
            .collect();

        self.invalidate();
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn params(&self) -> &GaParams {
        &self.params
    }

    /// Fitness of each chromosome, or `None` if the population has changed
    /// since it was last evaluated.
    pub fn fitness(&self) -> Option<&[f64]> {
        if !self.chromosomes.is_empty() && self.fitness.len() == self.chromosomes.len() {
            Some(&self.fitness)
        }
        else {
            None
        }
    }

    /// Score every chromosome against the danger field.
    ///
    /// On error the fitness is left stale.
    pub fn evaluate<D>(&mut self, danger: &D) -> Result<(), GaError>
    where
        D: DangerField + Sync + ?Sized,
    {
        self.invalidate();
        self.fitness = evaluate_fitness(&self.chromosomes, danger, &self.params)?;
        Ok(())
    }

    /// The best chromosome and its fitness, lowest index on ties.
    pub fn best(&self) -> Option<(&Chromosome, f64)> {
        let fitness = self.fitness()?;

        fitness
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, f)| (&self.chromosomes[i], *f))
    }

    /// Select the `floor(len * elitism_ratio)` fittest chromosomes.
    pub fn select_elites(&self) -> Result<EliteSet, GaError> {
        let fitness = self.fitness().ok_or_else(|| {
            GaError::Stale("elites can only be selected from an evaluated population".into())
        })?;

        let count = (fitness.len() as f64 * self.params.elitism_ratio).floor() as usize;

        // Stable sort so equal fitness keeps index order
        let mut order: Vec<usize> = (0..fitness.len()).collect();
        order.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]));
        order.truncate(count);

        Ok(EliteSet {
            epoch: self.epoch,
            indices: order,
        })
    }

    /// Cross random pairs of non-elite chromosomes, replacing the parents
    /// with their children.
    ///
    /// `floor(num_non_elites * crossover_ratio)` parents are chosen, rounded
    /// down to an even number. Pairs with a parent too short to cut are
    /// skipped.
    pub fn crossover<R: Rng>(
        &mut self,
        elites: &EliteSet,
        rng: &mut R,
    ) -> Result<CrossoverReport, GaError> {
        self.check_elites(elites)?;

        let non_elites: Vec<usize> = (0..self.chromosomes.len())
            .filter(|i| !elites.contains(*i))
            .collect();

        let mut num_parents =
            (non_elites.len() as f64 * self.params.crossover_ratio).floor() as usize;
        num_parents -= num_parents % 2;

        // Positions are drawn into the non-elite list, then mapped back to
        // population indices
        let parents: Vec<usize> = index::sample(rng, non_elites.len(), num_parents)
            .into_iter()
            .map(|pos| non_elites[pos])
            .collect();

        let mut report = CrossoverReport::default();
        for pair in parents.chunks_exact(2) {
            let (a, b) = (pair[0], pair[1]);

            match self.chromosomes[a].crossover(&self.chromosomes[b], rng) {
                Ok((son, daughter)) => {
                    self.chromosomes[a] = son;
                    self.chromosomes[b] = daughter;
                    report.pairs += 1;
                }
                Err(e) => {
                    trace!("Skipping crossover of {} and {}: {}", a, b, e);
                    report.skipped += 1;
                }
            }
        }

        self.fitness.clear();

        Ok(report)
    }

    /// Mutate each chromosome with probability `mutation_ratio`.
    ///
    /// Elites are skipped unless `mutate_elites` is set. This is the last
    /// step of a generation to use the elites, so the set is consumed.
    pub fn mutate<R: Rng>(
        &mut self,
        elites: EliteSet,
        rng: &mut R,
    ) -> Result<MutationReport, GaError> {
        self.check_elites(&elites)?;

        let mut report = MutationReport::default();

        for i in 0..self.chromosomes.len() {
            if !self.params.mutate_elites && elites.contains(i) {
                continue;
            }

            if !rng.random_bool(self.params.mutation_ratio) {
                continue;
            }

            match self.chromosomes[i].mutate(rng, self.extent) {
                Ok(MutationKind::Edit) => report.edits += 1,
                Ok(MutationKind::Insert) => report.inserts += 1,
                Ok(MutationKind::Delete) => report.deletes += 1,
                Err(e @ GaError::InvalidGenomeLength { .. }) => {
                    trace!("Skipping mutation of {}: {}", i, e);
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.fitness.clear();

        Ok(report)
    }

    /// Remove every chromosome whose curve passes within an obstacle's
    /// radius, returning how many were removed.
    pub fn validate(&mut self, obstacles: &[Obstacle]) -> usize {
        let resolution = self.params.projection_resolution;
        let before = self.chromosomes.len();

        self.chromosomes.retain(|c| is_valid(c, obstacles, resolution));

        let removed = before - self.chromosomes.len();
        if removed > 0 {
            debug!("Validation removed {} of {} chromosomes", removed, before);
            self.invalidate();
        }

        removed
    }

    /// Apply the respawn policy after validation, returning the number of
    /// chromosomes added.
    ///
    /// Under [`RespawnPolicy::Respawn`] the population is refilled to
    /// `population_size` with random chromosomes which pass validation. Slots
    /// for which no valid chromosome is found within `respawn_attempts` are
    /// left empty. Under [`RespawnPolicy::Shrink`] nothing is added.
    pub fn repair<R: Rng>(&mut self, obstacles: &[Obstacle], rng: &mut R) -> usize {
        if self.params.respawn_policy == RespawnPolicy::Shrink {
            return 0;
        }

        let deficit = self.params.population_size.saturating_sub(self.chromosomes.len());
        if deficit == 0 {
            return 0;
        }

        let (start, end) = (self.params.start(), self.params.end());
        let num_interior = self.params.initial_length - 2;
        let resolution = self.params.projection_resolution;

        let mut added = 0;
        for _ in 0..deficit {
            let spawned = (0..self.params.respawn_attempts)
                .map(|_| Chromosome::random(rng, start, end, num_interior, self.extent))
                .find(|c| is_valid(c, obstacles, resolution));

            if let Some(c) = spawned {
                self.chromosomes.push(c);
                added += 1;
            }
        }

        if added < deficit {
            warn!(
                "Only respawned {} of {} chromosomes within {} attempts each",
                added, deficit, self.params.respawn_attempts
            );
        }

        if added > 0 {
            self.invalidate();
        }

        added
    }

    fn invalidate(&mut self) {
        self.fitness.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn check_elites(&self, elites: &EliteSet) -> Result<(), GaError> {
        if elites.epoch != self.epoch {
            return Err(GaError::Stale(
                "elite set was selected before the population last changed".into(),
            ));
        }
        Ok(())
    }
}

impl EliteSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Elite indices, best first
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }
}

impl MutationReport {
    /// Number of mutations applied
    pub fn total(&self) -> usize {
        self.edits + self.inserts + self.deletes
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Whether the chromosome's curve stays clear of every obstacle.
///
/// A curve touching an obstacle's edge (distance equal to the radius) is
/// invalid, as is a chromosome whose curve can't be built or projected onto.
pub fn is_valid(chromosome: &Chromosome, obstacles: &[Obstacle], resolution: usize) -> bool {
    let curve = match chromosome.to_curve() {
        Ok(c) => c,
        Err(_) => return false,
    };

    obstacles.iter().all(|obs| {
        match curve.project_with_resolution(&obs.position, resolution) {
            Ok(proj) => proj.distance > obs.radius,
            Err(_) => false,
        }
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::DangerMap;
    use rand::{rngs::StdRng, SeedableRng};

    fn extent() -> Point2D {
        Point2D::new(1500.0, 800.0)
    }

    fn chromosome(coords: &[(f64, f64)]) -> Chromosome {
        Chromosome::new(coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()).unwrap()
    }

    fn params(size: usize) -> GaParams {
        GaParams {
            population_size: size,
            ..GaParams::default()
        }
    }

    /// Ten chromosomes over the same start and end, with increasing detours
    fn ladder() -> Population {
        let chromosomes = (0..10)
            .map(|i| chromosome(&[(0.0, 0.0), (50.0, 10.0 * i as f64 + 1.0), (100.0, 0.0)]))
            .collect();

        let mut pop = Population::from_chromosomes(
            GaParams {
                start: [0.0, 0.0],
                end: [100.0, 0.0],
                ..params(10)
            },
            extent(),
            chromosomes,
        )
        .unwrap();
        pop.evaluate(&DangerMap::zeros()).unwrap();
        pop
    }

    #[test]
    fn test_new_rejects_map_without_free_genes() {
        // The only cell of a 1x1 map is the start
        let p = GaParams {
            start: [0.0, 0.0],
            end: [10.0, 10.0],
            ..params(10)
        };

        assert!(matches!(
            Population::new(p.clone(), Point2D::new(1.0, 1.0)),
            Err(GaError::InvalidParams(_))
        ));
        assert!(Population::new(p, Point2D::new(2.0, 1.0)).is_ok());
    }

    #[test]
    fn test_initialise() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = Population::new(params(25), extent()).unwrap();
        pop.initialise(&mut rng);

        assert_eq!(pop.len(), 25);
        assert!(pop.fitness().is_none());
        for c in pop.chromosomes() {
            assert_eq!(c.len(), 5);
            assert_eq!(c.start(), pop.params().start());
            assert_eq!(c.end(), pop.params().end());
        }
    }

    #[test]
    fn test_select_elites() {
        let pop = ladder();
        let elites = pop.select_elites().unwrap();

        // floor(10 * 0.3)
        assert_eq!(elites.indices(), &[0, 1, 2]);

        let (best, f) = pop.best().unwrap();
        assert_eq!(best, &pop.chromosomes()[0]);
        assert_eq!(f, pop.fitness().unwrap()[0]);
    }

    #[test]
    fn test_select_elites_needs_fitness() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = Population::new(params(5), extent()).unwrap();
        pop.initialise(&mut rng);

        assert!(matches!(pop.select_elites(), Err(GaError::Stale(_))));
        assert!(pop.best().is_none());
    }

    #[test]
    fn test_stale_elites_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = ladder();
        let elites = pop.select_elites().unwrap();

        pop.evaluate(&DangerMap::zeros()).unwrap();

        assert!(matches!(
            pop.crossover(&elites, &mut rng),
            Err(GaError::Stale(_))
        ));
        assert!(matches!(pop.mutate(elites, &mut rng), Err(GaError::Stale(_))));
    }

    #[test]
    fn test_crossover_spares_elites() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut pop = ladder();
        pop.params.crossover_ratio = 1.0;
        let before = pop.chromosomes().to_vec();

        let elites = pop.select_elites().unwrap();
        let report = pop.crossover(&elites, &mut rng).unwrap();

        // 7 non-elites gives 3 pairs
        assert_eq!(report.pairs + report.skipped, 3);
        assert_eq!(pop.len(), 10);
        assert!(pop.fitness().is_none());
        for &i in elites.indices() {
            assert_eq!(pop.chromosomes()[i], before[i]);
        }
    }

    #[test]
    fn test_mutation_spares_elites_when_asked() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut pop = ladder();
        pop.params.mutation_ratio = 1.0;
        pop.params.mutate_elites = false;
        let before = pop.chromosomes().to_vec();

        let elites = pop.select_elites().unwrap();
        let elite_indices = elites.indices().to_vec();
        let report = pop.mutate(elites, &mut rng).unwrap();

        assert_eq!(report.total() + report.skipped, 7);
        for i in elite_indices {
            assert_eq!(pop.chromosomes()[i], before[i]);
        }
    }

    #[test]
    fn test_validate_removes_colliding() {
        let obstacles = vec![Obstacle::new(Point2D::new(50.0, 0.0), 5.0)];
        let mut pop = Population::from_chromosomes(
            GaParams {
                start: [0.0, 0.0],
                end: [100.0, 0.0],
                ..params(2)
            },
            extent(),
            vec![
                chromosome(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]),
                chromosome(&[(0.0, 0.0), (50.0, 100.0), (100.0, 0.0)]),
            ],
        )
        .unwrap();

        assert_eq!(pop.validate(&obstacles), 1);
        assert_eq!(pop.len(), 1);
        assert_eq!(pop.chromosomes()[0].genes()[1], Point2D::new(50.0, 100.0));
    }

    #[test]
    fn test_touching_edge_is_invalid() {
        // Curve passes exactly one radius from the centre
        let c = chromosome(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]);
        let obstacles = [Obstacle::new(Point2D::new(50.0, 10.0), 10.0)];

        assert!(!is_valid(&c, &obstacles, 100));
        assert!(is_valid(&c, &[Obstacle::new(Point2D::new(50.0, 10.0), 9.0)], 100));
    }

    #[test]
    fn test_respawn_and_shrink() {
        let obstacles = vec![Obstacle::new(Point2D::new(750.0, 400.0), 50.0)];

        for policy in [RespawnPolicy::Respawn, RespawnPolicy::Shrink] {
            let mut rng = StdRng::seed_from_u64(21);
            let mut pop = Population::new(
                GaParams {
                    respawn_policy: policy,
                    ..params(30)
                },
                extent(),
            )
            .unwrap();
            pop.initialise(&mut rng);

            let removed = pop.validate(&obstacles);
            let added = pop.repair(&obstacles, &mut rng);

            match policy {
                RespawnPolicy::Respawn => {
                    assert_eq!(added, removed);
                    assert_eq!(pop.len(), 30);
                }
                RespawnPolicy::Shrink => {
                    assert_eq!(added, 0);
                    assert_eq!(pop.len(), 30 - removed);
                }
            }

            for c in pop.chromosomes() {
                assert!(is_valid(c, &obstacles, 100));
            }
        }
    }
}
