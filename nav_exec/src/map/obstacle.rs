//! # Obstacles
//!
//! Obstacles are circles on the map plane. The terrain file holds one obstacle
//! per line as `x y radius`, separated by whitespace. Blank lines and lines
//! starting with `#` are ignored.

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::{fmt::Write as _, fs, path::Path};

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{MapError, ObstacleGenParams};
use crate::geom::Point2D;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of placement attempts per obstacle before giving up on it.
const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A circular obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Centre of the obstacle
    pub position: Point2D,

    /// Radius of the obstacle
    pub radius: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Obstacle {
    pub fn new(position: Point2D, radius: f64) -> Self {
        Self { position, radius }
    }

    /// Distance from the obstacle's edge to the point, negative inside.
    pub fn clearance(&self, point: &Point2D) -> f64 {
        (point - self.position).norm() - self.radius
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse the contents of a terrain file.
pub fn parse_obstacles(contents: &str) -> Result<Vec<Obstacle>, MapError> {
    let mut obstacles = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        let line_num = i + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = line
            .split_whitespace()
            .map(|f| {
                f.parse::<f64>().map_err(|e| MapError::Parse {
                    line: line_num,
                    reason: format!("cannot parse {:?} as a number: {}", f, e),
                })
            })
            .collect::<Result<Vec<f64>, MapError>>()?;

        if fields.len() != 3 {
            return Err(MapError::Parse {
                line: line_num,
                reason: format!("expected 3 fields (x y radius), found {}", fields.len()),
            });
        }

        if fields.iter().any(|f| !f.is_finite()) {
            return Err(MapError::Parse {
                line: line_num,
                reason: "obstacle fields must be finite".into(),
            });
        }

        if fields[2] <= 0.0 {
            return Err(MapError::Parse {
                line: line_num,
                reason: format!("obstacle radius must be positive, found {}", fields[2]),
            });
        }

        obstacles.push(Obstacle::new(Point2D::new(fields[0], fields[1]), fields[2]));
    }

    Ok(obstacles)
}

/// Load obstacles from a terrain file.
pub fn load_obstacles<P: AsRef<Path>>(path: P) -> Result<Vec<Obstacle>, MapError> {
    let contents = fs::read_to_string(path.as_ref())
        .map_err(|e| MapError::Io(path.as_ref().to_path_buf(), e))?;

    parse_obstacles(&contents)
}

/// Write obstacles to a terrain file, in the format read by [`load_obstacles`].
pub fn save_obstacles<P: AsRef<Path>>(path: P, obstacles: &[Obstacle]) -> Result<(), MapError> {
    let mut contents = String::new();
    for obs in obstacles {
        // Writing into a String can't fail
        let _ = writeln!(
            contents,
            "{} {} {}",
            obs.position[0], obs.position[1], obs.radius
        );
    }

    fs::write(path.as_ref(), contents).map_err(|e| MapError::Io(path.as_ref().to_path_buf(), e))
}

/// Generate a random obstacle field covering `[0, extent.x) x [0, extent.y)`.
///
/// Obstacles are kept at least `params.clearance` away from every point in
/// `keep_clear` (the start and end of the path). If an obstacle can't be placed
/// after a number of attempts it's dropped, so fewer than
/// `params.num_obstacles` may be returned.
pub fn generate_obstacles<R: Rng>(
    rng: &mut R,
    params: &ObstacleGenParams,
    extent: Point2D,
    keep_clear: &[Point2D],
) -> Vec<Obstacle> {
    let min_radius = params.min_radius.min(params.max_radius);
    let max_radius = params.max_radius.max(params.min_radius);

    let mut obstacles = Vec::with_capacity(params.num_obstacles);

    for _ in 0..params.num_obstacles {
        let placed = (0..MAX_PLACEMENT_ATTEMPTS)
            .map(|_| {
                let radius = if max_radius > min_radius {
                    rng.random_range(min_radius..max_radius)
                }
                else {
                    min_radius
                };
                Obstacle::new(
                    Point2D::new(
                        rng.random_range(0.0..extent[0]),
                        rng.random_range(0.0..extent[1]),
                    ),
                    radius,
                )
            })
            .find(|obs| keep_clear.iter().all(|p| obs.clearance(p) >= params.clearance));

        match placed {
            Some(obs) => obstacles.push(obs),
            None => warn!(
                "Could not place obstacle {} clear of the keep-clear points",
                obstacles.len()
            ),
        }
    }

    debug!("Generated {} obstacles", obstacles.len());

    obstacles
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
