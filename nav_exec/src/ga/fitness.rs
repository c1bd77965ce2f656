//! Fitness evaluation
//!
//! Fitness is minimised. A chromosome's fitness is
//!
//! ```text
//! length_weight * min(length / max_length, 1) + danger_weight * danger
//! ```
//!
//! where `max_length` is the longest curve in the population being evaluated
//! and `danger` is the mean danger sampled along the curve. Curves whose
//! danger reaches `danger_threshold` get `danger_penalty` instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Internal
use super::{Chromosome, GaError, GaParams};
use crate::{geom::BezierCurve, map::DangerField};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Danger sampled along a curve.
///
/// The total is kept alongside the sample count so the threshold test doesn't
/// depend on the rounding of the mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathDanger {
    total: f64,
    samples: usize,
}

impl PathDanger {
    /// Accumulate danger values with Neumaier compensated summation.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut total = 0.0;
        let mut compensation = 0.0;
        let mut samples = 0;

        for v in values {
            let t = total + v;
            if f64::abs(total) >= f64::abs(v) {
                compensation += (total - t) + v;
            }
            else {
                compensation += (v - t) + total;
            }
            total = t;
            samples += 1;
        }

        Self {
            total: total + compensation,
            samples,
        }
    }

    /// Mean danger, zero when nothing was sampled.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        }
        else {
            self.total / self.samples as f64
        }
    }

    /// Whether the mean danger is at or above `threshold`.
    pub fn reaches(&self, threshold: f64) -> bool {
        self.samples > 0 && self.total >= threshold * self.samples as f64
    }
}

/// Danger of `samples + 1` uniformly spaced points along the curve.
pub fn path_danger<D>(curve: &BezierCurve, danger: &D, samples: usize) -> PathDanger
where
    D: DangerField + ?Sized,
{
    PathDanger::from_values(curve.sample(samples).iter().map(|p| danger.danger(p)))
}

/// Fitness of a path given its normalised length and danger.
pub fn fitness(normalised_length: f64, danger: &PathDanger, params: &GaParams) -> f64 {
    if danger.reaches(params.danger_threshold) {
        params.danger_penalty
    }
    else {
        params.length_weight * normalised_length + params.danger_weight * danger.mean()
    }
}

/// Score every chromosome, returning fitness values in the same order.
///
/// Chromosomes whose curve can't be built (all genes coincident) get the
/// danger penalty. With the `parallel` feature the scoring is spread over the
/// rayon thread pool, the result is identical either way.
pub fn evaluate_fitness<D>(
    chromosomes: &[Chromosome],
    danger: &D,
    params: &GaParams,
) -> Result<Vec<f64>, GaError>
where
    D: DangerField + Sync + ?Sized,
{
    if chromosomes.is_empty() {
        return Err(GaError::EmptyPopulation);
    }

    // Lengths have to be known for the whole population before any
    // chromosome can be normalised
    let curves: Vec<Option<(BezierCurve, f64)>> = chromosomes
        .iter()
        .map(|c| match c.to_curve() {
            Ok(curve) => {
                let len = curve.length(params.length_samples);
                Some((curve, len))
            }
            Err(e) => {
                warn!("Chromosome {:?} has no valid curve: {}", c.genes(), e);
                None
            }
        })
        .collect();

    let max_length = curves
        .iter()
        .flatten()
        .map(|(_, len)| *len)
        .fold(0.0, f64::max);

    if max_length <= 0.0 || !max_length.is_finite() {
        return Err(GaError::DivisionByZero);
    }

    let score = |entry: &Option<(BezierCurve, f64)>| match entry {
        Some((curve, len)) => {
            let normalised = (len / max_length).min(1.0);
            let d = path_danger(curve, danger, params.danger_samples);
            fitness(normalised, &d, params)
        }
        None => params.danger_penalty,
    };

    #[cfg(feature = "parallel")]
    let scores: Vec<f64> = curves.par_iter().map(score).collect();

    #[cfg(not(feature = "parallel"))]
    let scores: Vec<f64> = curves.iter().map(score).collect();

    Ok(scores)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Point2D;
    use crate::map::DangerMap;

    struct Constant(f64);

    impl DangerField for Constant {
        fn danger(&self, _: &Point2D) -> f64 {
            self.0
        }
    }

    fn chromosome(coords: &[(f64, f64)]) -> Chromosome {
        Chromosome::new(coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()).unwrap()
    }

    #[test]
    fn test_single_chromosome_no_danger() {
        let params = GaParams::default();
        let c = chromosome(&[(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)]);

        let scores = evaluate_fitness(&[c], &DangerMap::zeros(), &params).unwrap();

        // The only chromosome is also the longest
        assert_eq!(scores, vec![params.length_weight]);
    }

    #[test]
    fn test_penalty() {
        let params = GaParams::default();
        let c = chromosome(&[(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)]);

        // Exactly at the threshold is penalised
        let scores = evaluate_fitness(&[c.clone()], &Constant(0.2), &params).unwrap();
        assert_eq!(scores, vec![params.danger_penalty]);

        let scores = evaluate_fitness(&[c], &Constant(0.1), &params).unwrap();
        assert!((scores[0] - (0.2 + 0.8 * 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_shorter_is_fitter() {
        let params = GaParams::default();
        let straight = chromosome(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]);
        let detour = chromosome(&[(0.0, 0.0), (50.0, 300.0), (100.0, 0.0)]);

        let scores =
            evaluate_fitness(&[straight, detour], &DangerMap::zeros(), &params).unwrap();

        assert!(scores[0] < scores[1]);
        assert_eq!(scores[1], params.length_weight);
    }

    #[test]
    fn test_empty_population() {
        assert!(matches!(
            evaluate_fitness(&[], &DangerMap::zeros(), &GaParams::default()),
            Err(GaError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_zero_length() {
        // Coincident genes can't form a curve, so no length is available
        let c = chromosome(&[(5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]);

        assert!(matches!(
            evaluate_fitness(&[c], &DangerMap::zeros(), &GaParams::default()),
            Err(GaError::DivisionByZero)
        ));
    }

    #[test]
    fn test_path_danger_is_mean() {
        let map = DangerMap::from_rows(vec![vec![0.0, 1.0]], 10.0).unwrap();
        let curve = BezierCurve::new(vec![
            Point2D::new(0.0, 5.0),
            Point2D::new(10.0, 5.0),
            Point2D::new(19.0, 5.0),
        ])
        .unwrap();

        let d = path_danger(&curve, &map, 100).mean();
        assert!(d > 0.0 && d < 1.0);
    }

    #[test]
    fn test_threshold_uniform_field() {
        // Summing these naively lands just under the threshold
        for &(v, n) in &[(0.2, 101), (0.2, 11), (0.1, 1001), (0.7, 31), (0.3, 11)] {
            let d = PathDanger::from_values(std::iter::repeat(v).take(n));
            assert!(d.reaches(v), "{} x {} should reach {}", v, n, v);
            assert!(!d.reaches(v + 1e-9));
            assert!((d.mean() - v).abs() < 1e-15);
        }

        assert!(!PathDanger::from_values(std::iter::empty()).reaches(0.0));
    }
}
