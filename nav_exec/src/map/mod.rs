//! # Map
//!
//! This module implements the read-only world the planner works in: a list of
//! circular [`Obstacle`]s and a [`DangerMap`] giving a danger value in `[0, 1]`
//! for any point on the plane. Both are loaded once, from the terrain and
//! danger map files, and bundled together with the map extent into a
//! [`Terrain`].
//!
//! The danger map can also be generated from the obstacles, in which case each
//! obstacle acts as a repulsive potential: danger is 1 inside the obstacle and
//! falls linearly to 0 at `influence_distance` from its edge.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

/// Implements the [`DangerMap`] grid
mod danger_map;

/// Implements the [`Obstacle`] type and the terrain file format
mod obstacle;

/// Terrain parameters
mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use log::info;

pub use danger_map::{DangerField, DangerMap};
pub use obstacle::{generate_obstacles, load_obstacles, parse_obstacles, save_obstacles, Obstacle};
pub use params::{ObstacleGenParams, TerrainParams};

use crate::geom::Point2D;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The obstacles, danger and extent of the world.
#[derive(Debug, Clone)]
pub struct Terrain {
    /// Size of the map, the map covers `[0, extent.x) x [0, extent.y)`
    pub extent: Point2D,

    /// Obstacles paths must avoid
    pub obstacles: Vec<Obstacle>,

    /// Danger field sampled along candidate paths
    pub danger: DangerMap,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Cannot access map file {0:?}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Danger map row on line {line} has {found} cells, expected {expected}")]
    RaggedDangerMap {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Danger map contains no cells")]
    EmptyDangerMap,

    #[error("Invalid danger map cell size {0}, must be positive")]
    InvalidCellSize(f64),

    #[error("Invalid map extent ({0}, {1}), must be positive")]
    InvalidExtent(f64, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Terrain {
    /// Create a terrain from parts already in memory.
    pub fn new(extent: Point2D, obstacles: Vec<Obstacle>, danger: DangerMap) -> Self {
        Self {
            extent,
            obstacles,
            danger,
        }
    }

    /// A terrain with no obstacles and zero danger everywhere.
    pub fn empty(extent: Point2D) -> Self {
        Self {
            extent,
            obstacles: Vec::new(),
            danger: DangerMap::zeros(),
        }
    }

    /// Load the terrain described by the parameters.
    ///
    /// File paths in the parameters are resolved against `data_dir`. If no
    /// danger map file is given the danger map is generated from the
    /// obstacles.
    pub fn load<P: AsRef<Path>>(params: &TerrainParams, data_dir: P) -> Result<Self, MapError> {
        let extent = params.extent()?;

        let obstacles_path = data_dir.as_ref().join(&params.obstacles_file);
        let obstacles = load_obstacles(&obstacles_path)?;
        info!(
            "Loaded {} obstacles from {:?}",
            obstacles.len(),
            obstacles_path
        );

        let danger = match params.danger_map_file {
            Some(ref f) => {
                let danger_path = data_dir.as_ref().join(f);
                let map = DangerMap::load(&danger_path, params.cell_size)?;
                info!(
                    "Loaded {}x{} danger map from {:?}",
                    map.num_cells().0,
                    map.num_cells().1,
                    danger_path
                );
                map
            }
            None => {
                info!("No danger map file given, generating from obstacles");
                DangerMap::from_obstacles(
                    &obstacles,
                    extent,
                    params.cell_size,
                    params.influence_distance,
                )?
            }
        };

        Ok(Self::new(extent, obstacles, danger))
    }

    /// Danger at the given point.
    pub fn danger(&self, point: &Point2D) -> f64 {
        self.danger.danger(point)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
