//! Chromosomes and the genetic operators acting on them

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use rand::Rng;
use serde::Serialize;

// Internal
use super::GaError;
use crate::geom::{BezierCurve, ControlPoint, GeomError, Point2D};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Attempts made to draw a random gene that isn't the start or end point.
const MAX_GENE_ATTEMPTS: usize = 1000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A candidate path, the ordered control points of a Bezier curve.
///
/// The first gene is always the start point and the last gene always the end
/// point. There is always at least one interior gene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chromosome {
    genes: Vec<ControlPoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The three mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Replace an interior gene with a new random point
    Edit,

    /// Insert a new random interior gene
    Insert,

    /// Remove an interior gene
    Delete,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Chromosome {
    /// Minimum number of genes, start + one interior + end.
    pub const MIN_LEN: usize = 3;

    /// Create a chromosome from its genes.
    pub fn new(genes: Vec<ControlPoint>) -> Result<Self, GaError> {
        if genes.len() < Self::MIN_LEN {
            return Err(GaError::InvalidGenomeLength {
                len: genes.len(),
                min: Self::MIN_LEN,
            });
        }

        Ok(Self { genes })
    }

    /// Create a random chromosome with `num_interior` interior genes between
    /// `start` and `end`.
    ///
    /// Interior genes have integer coordinates in `[0, extent.x) x [0,
    /// extent.y)` and never equal the start or end point.
    pub fn random<R: Rng>(
        rng: &mut R,
        start: Point2D,
        end: Point2D,
        num_interior: usize,
        extent: Point2D,
    ) -> Self {
        let mut genes = Vec::with_capacity(num_interior.max(1) + 2);

        genes.push(start);
        for _ in 0..num_interior.max(1) {
            genes.push(random_gene(rng, extent, &start, &end));
        }
        genes.push(end);

        Self { genes }
    }

    pub fn genes(&self) -> &[ControlPoint] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn start(&self) -> ControlPoint {
        self.genes[0]
    }

    pub fn end(&self) -> ControlPoint {
        self.genes[self.genes.len() - 1]
    }

    /// The genes between the start and end points.
    pub fn interior(&self) -> &[ControlPoint] {
        &self.genes[1..self.genes.len() - 1]
    }

    /// Build the Bezier curve this chromosome encodes.
    pub fn to_curve(&self) -> Result<BezierCurve, GeomError> {
        BezierCurve::new(self.genes.clone())
    }

    /// Single point crossover with another chromosome, see
    /// [`single_point_crossover`].
    pub fn crossover<R: Rng>(
        &self,
        other: &Chromosome,
        rng: &mut R,
    ) -> Result<(Chromosome, Chromosome), GaError> {
        let (son, daughter) = single_point_crossover(&self.genes, &other.genes, rng)?;
        Ok((Self::new(son)?, Self::new(daughter)?))
    }

    /// Apply a random mutation.
    ///
    /// Edit, insert and delete are equally likely. A delete picked for a
    /// chromosome with a single interior gene fails with
    /// [`GaError::InvalidGenomeLength`] and leaves the chromosome unchanged.
    pub fn mutate<R: Rng>(
        &mut self,
        rng: &mut R,
        extent: Point2D,
    ) -> Result<MutationKind, GaError> {
        let kind = match rng.random_range(0..3) {
            0 => MutationKind::Edit,
            1 => MutationKind::Insert,
            _ => MutationKind::Delete,
        };

        match kind {
            MutationKind::Edit => self.mutate_edit(rng, extent),
            MutationKind::Insert => self.mutate_insert(rng, extent),
            MutationKind::Delete => self.mutate_delete(rng)?,
        }

        Ok(kind)
    }

    /// Replace a random interior gene with a new random point.
    pub fn mutate_edit<R: Rng>(&mut self, rng: &mut R, extent: Point2D) {
        let pos = rng.random_range(1..self.genes.len() - 1);
        let (start, end) = (self.start(), self.end());
        self.genes[pos] = random_gene(rng, extent, &start, &end);
    }

    /// Insert a new random gene at a random position in `[1, len - 1]`, so
    /// the start and end genes stay in place.
    pub fn mutate_insert<R: Rng>(&mut self, rng: &mut R, extent: Point2D) {
        let pos = rng.random_range(1..self.genes.len());
        let (start, end) = (self.start(), self.end());
        let gene = random_gene(rng, extent, &start, &end);
        self.genes.insert(pos, gene);
    }

    /// Remove a random interior gene.
    ///
    /// Fails with [`GaError::InvalidGenomeLength`] if the chromosome has a
    /// single interior gene.
    pub fn mutate_delete<R: Rng>(&mut self, rng: &mut R) -> Result<(), GaError> {
        if self.genes.len() <= Self::MIN_LEN {
            return Err(GaError::InvalidGenomeLength {
                len: self.genes.len(),
                min: Self::MIN_LEN + 1,
            });
        }

        let pos = rng.random_range(1..self.genes.len() - 1);
        self.genes.remove(pos);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Number of integer gene positions along each axis of the map.
fn gene_grid(extent: Point2D) -> (i64, i64) {
    (
        (extent[0].floor() as i64).max(1),
        (extent[1].floor() as i64).max(1),
    )
}

/// Whether the map has an integer gene position that is neither `start` nor
/// `end`.
pub fn has_free_gene(extent: Point2D, start: &Point2D, end: &Point2D) -> bool {
    let (max_x, max_y) = gene_grid(extent);
    let on_grid = |p: &Point2D| {
        p[0].fract() == 0.0
            && p[1].fract() == 0.0
            && (0.0..max_x as f64).contains(&p[0])
            && (0.0..max_y as f64).contains(&p[1])
    };

    let taken = if start == end {
        on_grid(start) as i64
    }
    else {
        on_grid(start) as i64 + on_grid(end) as i64
    };

    max_x.saturating_mul(max_y) > taken
}

/// Draw a random integer valued gene inside the map which is neither `start`
/// nor `end`.
///
/// The map must have room for such a gene, see [`has_free_gene`]. Otherwise
/// `start` is returned.
pub fn random_gene<R: Rng>(
    rng: &mut R,
    extent: Point2D,
    start: &Point2D,
    end: &Point2D,
) -> ControlPoint {
    let (max_x, max_y) = gene_grid(extent);

    for _ in 0..MAX_GENE_ATTEMPTS {
        let gene = Point2D::new(
            rng.random_range(0..max_x) as f64,
            rng.random_range(0..max_y) as f64,
        );

        if gene != *start && gene != *end {
            return gene;
        }
    }

    // Almost every cell is the start or end, so take the first free one
    (0..max_y)
        .flat_map(|y| (0..max_x).map(move |x| Point2D::new(x as f64, y as f64)))
        .find(|g| g != start && g != end)
        .unwrap_or_else(|| {
            warn!("No gene position in a {}x{} map is free of the start and end", max_x, max_y);
            *start
        })
}

/// Swap the tails of two gene sequences at a random cut.
///
/// The cut is drawn from `[1, min_len - 1)` so both children keep a start
/// gene from one parent, an end gene from the other, and at least one
/// interior gene. Parents may have different lengths. Fails with
/// [`GaError::InvalidGenomeLength`] if either parent has fewer than 3 genes.
pub fn single_point_crossover<R: Rng>(
    mom: &[ControlPoint],
    dad: &[ControlPoint],
    rng: &mut R,
) -> Result<(Vec<ControlPoint>, Vec<ControlPoint>), GaError> {
    let min_len = mom.len().min(dad.len());
    if min_len < Chromosome::MIN_LEN {
        return Err(GaError::InvalidGenomeLength {
            len: min_len,
            min: Chromosome::MIN_LEN,
        });
    }

    let cut = rng.random_range(1..min_len - 1);

    let son = mom[..cut].iter().chain(dad[cut..].iter()).copied().collect();
    let daughter = dad[..cut].iter().chain(mom[cut..].iter()).copied().collect();

    Ok((son, daughter))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2D> {
        coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()
    }

    const EXTENT: (f64, f64) = (1500.0, 800.0);

    fn extent() -> Point2D {
        Point2D::new(EXTENT.0, EXTENT.1)
    }

    #[test]
    fn test_new_rejects_short() {
        assert!(matches!(
            Chromosome::new(pts(&[(0.0, 0.0), (1.0, 1.0)])),
            Err(GaError::InvalidGenomeLength { len: 2, min: 3 })
        ));
        assert!(Chromosome::new(pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)])).is_ok());
    }

    #[test]
    fn test_random() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Point2D::new(50.0, 750.0);
        let end = Point2D::new(1450.0, 50.0);

        for _ in 0..50 {
            let c = Chromosome::random(&mut rng, start, end, 3, extent());
            assert_eq!(c.len(), 5);
            assert_eq!(c.start(), start);
            assert_eq!(c.end(), end);
            for g in c.interior() {
                assert_eq!(g[0], g[0].round());
                assert_eq!(g[1], g[1].round());
                assert!(g[0] >= 0.0 && g[0] < EXTENT.0);
                assert!(g[1] >= 0.0 && g[1] < EXTENT.1);
                assert_ne!(*g, start);
                assert_ne!(*g, end);
            }
        }
    }

    #[test]
    fn test_random_gene_in_tiny_map() {
        let mut rng = StdRng::seed_from_u64(3);

        // A 2x1 map where one of the two cells is the start
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(5.0, 5.0);
        let extent = Point2D::new(2.0, 1.0);
        assert!(has_free_gene(extent, &start, &end));
        for _ in 0..20 {
            assert_eq!(random_gene(&mut rng, extent, &start, &end), Point2D::new(1.0, 0.0));
        }

        // A 1x1 map only holds the start
        assert!(!has_free_gene(Point2D::new(1.0, 1.0), &start, &end));
        assert!(!has_free_gene(Point2D::new(0.5, 0.5), &start, &end));
        assert!(!has_free_gene(
            Point2D::new(2.0, 1.0),
            &start,
            &Point2D::new(1.0, 0.0)
        ));

        // Off-grid endpoints never take a cell
        assert!(has_free_gene(
            Point2D::new(1.0, 1.0),
            &Point2D::new(0.5, 0.0),
            &Point2D::new(-1.0, 0.0)
        ));
    }

    #[test]
    fn test_crossover_example() {
        // With min length 3 the only possible cut is 1
        let mom = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let dad = pts(&[(0.0, 0.0), (5.0, 5.0), (6.0, 6.0), (2.0, 0.0)]);
        let mut rng = StdRng::seed_from_u64(0);

        let (son, daughter) = single_point_crossover(&mom, &dad, &mut rng).unwrap();

        assert_eq!(son, pts(&[(0.0, 0.0), (5.0, 5.0), (6.0, 6.0), (2.0, 0.0)]));
        assert_eq!(daughter, pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]));
    }

    #[test]
    fn test_crossover_preserves_genes() {
        let mut rng = StdRng::seed_from_u64(99);
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(100.0, 0.0);

        for i in 0..100 {
            let mom = Chromosome::random(&mut rng, start, end, 1 + i % 6, extent());
            let dad = Chromosome::random(&mut rng, start, end, 1 + (i * 7) % 5, extent());

            let (son, daughter) = mom.crossover(&dad, &mut rng).unwrap();

            assert_eq!(son.len() + daughter.len(), mom.len() + dad.len());
            assert_eq!(son.start(), start);
            assert_eq!(son.end(), end);
            assert_eq!(daughter.start(), start);
            assert_eq!(daughter.end(), end);
            assert!(son.len() >= 3 && daughter.len() >= 3);
        }
    }

    #[test]
    fn test_crossover_short_parent() {
        let mut rng = StdRng::seed_from_u64(0);
        let short = pts(&[(0.0, 0.0), (2.0, 0.0)]);
        let long = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);

        assert!(matches!(
            single_point_crossover(&short, &long, &mut rng),
            Err(GaError::InvalidGenomeLength { len: 2, .. })
        ));
    }

    #[test]
    fn test_mutations() {
        let mut rng = StdRng::seed_from_u64(5);
        let start = Point2D::new(10.0, 10.0);
        let end = Point2D::new(20.0, 10.0);
        let mut c = Chromosome::random(&mut rng, start, end, 2, extent());

        c.mutate_insert(&mut rng, extent());
        assert_eq!(c.len(), 5);

        c.mutate_edit(&mut rng, extent());
        assert_eq!(c.len(), 5);

        c.mutate_delete(&mut rng).unwrap();
        c.mutate_delete(&mut rng).unwrap();
        assert_eq!(c.len(), 3);

        // Can't go below a single interior gene
        assert!(matches!(
            c.mutate_delete(&mut rng),
            Err(GaError::InvalidGenomeLength { len: 3, min: 4 })
        ));

        assert_eq!(c.start(), start);
        assert_eq!(c.end(), end);
    }

    #[test]
    fn test_random_mutation_keeps_endpoints() {
        let mut rng = StdRng::seed_from_u64(11);
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(1000.0, 500.0);
        let mut c = Chromosome::random(&mut rng, start, end, 1, extent());

        let mut deletes_refused = 0;
        for _ in 0..500 {
            let len = c.len();
            match c.mutate(&mut rng, extent()) {
                Ok(_) => {}
                Err(GaError::InvalidGenomeLength { .. }) => {
                    assert_eq!(len, Chromosome::MIN_LEN);
                    assert_eq!(c.len(), len);
                    deletes_refused += 1;
                }
                Err(e) => panic!("Unexpected error {}", e),
            }
            assert!(c.len() >= Chromosome::MIN_LEN);
            assert_eq!(c.start(), start);
            assert_eq!(c.end(), end);
        }

        // Starting from a single interior gene some deletes must be refused
        assert!(deletes_refused > 0);
    }
}
