//! Terrain parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::MapError;
use crate::geom::Point2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the terrain the planner works in.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TerrainParams {
    /// Width of the map, along X.
    pub width: f64,

    /// Height of the map, along Y.
    pub height: f64,

    /// Size of one (square) danger map cell.
    pub cell_size: f64,

    /// Obstacle file, relative to the data directory.
    pub obstacles_file: String,

    /// Danger map file, relative to the data directory. If not given the
    /// danger map is generated from the obstacles.
    pub danger_map_file: Option<String>,

    /// Distance from the edge of an obstacle at which generated danger
    /// reaches zero.
    pub influence_distance: f64,

    /// If set, a new random obstacle field is generated and written to the
    /// obstacle (and danger map) files before loading.
    pub generate: Option<ObstacleGenParams>,
}

/// Parameters for random obstacle generation.
#[derive(Deserialize, Debug, Clone)]
pub struct ObstacleGenParams {
    /// Number of obstacles to place
    pub num_obstacles: usize,

    /// Smallest obstacle radius
    pub min_radius: f64,

    /// Largest obstacle radius
    pub max_radius: f64,

    /// Minimum gap between an obstacle's edge and the start or end points
    pub clearance: f64,

    /// Seed for the generator, random if not given
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 800.0,
            cell_size: 10.0,
            obstacles_file: "terrain.txt".into(),
            danger_map_file: None,
            influence_distance: 40.0,
            generate: None,
        }
    }
}

impl TerrainParams {
    /// The map extent as a vector, checking it's valid.
    pub fn extent(&self) -> Result<Point2D, MapError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(MapError::InvalidExtent(self.width, self.height));
        }

        Ok(Point2D::new(self.width, self.height))
    }
}
