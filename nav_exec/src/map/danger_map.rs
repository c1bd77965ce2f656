//! # Danger Map
//!
//! A grid of square cells each holding a danger value in `[0, 1]`. Cell
//! `(col, row)` covers `[col * cell_size, (col + 1) * cell_size)` along X and
//! `[row * cell_size, (row + 1) * cell_size)` along Y. Points outside the grid
//! have zero danger.
//!
//! The danger map file has one grid row per line, values separated by
//! whitespace, starting with row 0.

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::{fmt::Write as _, fs, path::Path};

use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use util::maths::lin_map;

use super::{MapError, Obstacle};
use crate::geom::Point2D;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A scalar danger field over the plane.
pub trait DangerField {
    /// Danger at the given point, in `[0, 1]`.
    fn danger(&self, point: &Point2D) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Danger Map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DangerMap {
    /// Side length of each cell
    cell_size: f64,

    /// Cell values indexed by (row, col)
    data: Array2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DangerMap {
    /// A map with no cells, so zero danger everywhere.
    pub fn zeros() -> Self {
        Self {
            cell_size: 1.0,
            data: Array2::zeros((0, 0)),
        }
    }

    /// Build a map from rows of values.
    ///
    /// Values are clamped into `[0, 1]`. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>, cell_size: f64) -> Result<Self, MapError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(MapError::InvalidCellSize(cell_size));
        }

        let num_cols = match rows.first() {
            Some(r) if !r.is_empty() => r.len(),
            _ => return Err(MapError::EmptyDangerMap),
        };

        let num_rows = rows.len();
        let mut values = Vec::with_capacity(num_cols * num_rows);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != num_cols {
                return Err(MapError::RaggedDangerMap {
                    line: i + 1,
                    expected: num_cols,
                    found: row.len(),
                });
            }
            values.extend(row.iter().map(|v| v.clamp(0.0, 1.0)));
        }

        // Every row was checked above, so the shape always matches
        let data = Array2::from_shape_vec((num_rows, num_cols), values)
            .map_err(|_| MapError::EmptyDangerMap)?;

        Ok(Self { cell_size, data })
    }

    /// Parse the contents of a danger map file.
    pub fn parse(contents: &str, cell_size: f64) -> Result<Self, MapError> {
        let mut rows = Vec::new();
        let mut num_cols = None;
        let mut clamped = 0usize;

        for (i, line) in contents.lines().enumerate() {
            let line_num = i + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let row = line
                .split_whitespace()
                .map(|f| match f.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(v) => Err(MapError::Parse {
                        line: line_num,
                        reason: format!("danger values must be finite, found {}", v),
                    }),
                    Err(e) => Err(MapError::Parse {
                        line: line_num,
                        reason: format!("cannot parse {:?} as a number: {}", f, e),
                    }),
                })
                .collect::<Result<Vec<f64>, MapError>>()?;

            // Check rows line up, reporting the file line rather than the row
            let expected = *num_cols.get_or_insert(row.len());
            if row.len() != expected {
                return Err(MapError::RaggedDangerMap {
                    line: line_num,
                    expected,
                    found: row.len(),
                });
            }

            clamped += row.iter().filter(|v| !(0.0..=1.0).contains(*v)).count();
            rows.push(row);
        }

        if clamped > 0 {
            warn!("{} danger values were outside [0, 1] and have been clamped", clamped);
        }

        Self::from_rows(rows, cell_size)
    }

    /// Load a danger map file.
    pub fn load<P: AsRef<Path>>(path: P, cell_size: f64) -> Result<Self, MapError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| MapError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents, cell_size)
    }

    /// Save the map in the format read by [`DangerMap::load`].
    ///
    /// A map with no cells can't be read back, so saving one is an error.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MapError> {
        if self.data.is_empty() {
            return Err(MapError::EmptyDangerMap);
        }

        let mut contents = String::new();

        for row in self.data.rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            // Writing into a String can't fail
            let _ = writeln!(contents, "{}", line.join(" "));
        }

        fs::write(path.as_ref(), contents).map_err(|e| MapError::Io(path.as_ref().to_path_buf(), e))
    }

    /// Generate a danger map from obstacles, treating each as a repulsive
    /// potential.
    ///
    /// The danger of a cell is evaluated at its centre: 1 inside an obstacle,
    /// falling linearly to 0 at `influence_distance` from the obstacle's edge.
    /// Where obstacles overlap the largest danger is kept.
    pub fn from_obstacles(
        obstacles: &[Obstacle],
        extent: Point2D,
        cell_size: f64,
        influence_distance: f64,
    ) -> Result<Self, MapError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(MapError::InvalidCellSize(cell_size));
        }
        if !(extent[0] > 0.0 && extent[1] > 0.0) {
            return Err(MapError::InvalidExtent(extent[0], extent[1]));
        }

        let num_cols = (extent[0] / cell_size).ceil() as usize;
        let num_rows = (extent[1] / cell_size).ceil() as usize;

        let data = Array2::from_shape_fn((num_rows, num_cols), |(row, col)| {
            let centre = Point2D::new(
                (col as f64 + 0.5) * cell_size,
                (row as f64 + 0.5) * cell_size,
            );
            obstacles
                .iter()
                .map(|obs| potential(obs, &centre, influence_distance))
                .fold(0.0, f64::max)
                .clamp(0.0, 1.0)
        });

        debug!(
            "Generated {}x{} danger map from {} obstacles",
            num_cols,
            num_rows,
            obstacles.len()
        );

        Ok(Self { cell_size, data })
    }

    /// Number of columns and rows in the map.
    pub fn num_cells(&self) -> (usize, usize) {
        let (num_rows, num_cols) = self.data.dim();
        (num_cols, num_rows)
    }

    /// Side length of a cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Cell containing the position, or `None` if outside the map.
    pub fn position_to_cell(&self, position: &Point2D) -> Option<(usize, usize)> {
        if !(position[0] >= 0.0 && position[1] >= 0.0) {
            return None;
        }

        let col = (position[0] / self.cell_size).floor() as usize;
        let row = (position[1] / self.cell_size).floor() as usize;

        self.data.get((row, col)).map(|_| (col, row))
    }

    /// Value of the given cell, or `None` if outside the map.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }
}

impl DangerField for DangerMap {
    fn danger(&self, point: &Point2D) -> f64 {
        self.position_to_cell(point)
            .and_then(|(col, row)| self.get(col, row))
            .unwrap_or(0.0)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Danger contributed by a single obstacle at a point.
fn potential(obstacle: &Obstacle, point: &Point2D, influence_distance: f64) -> f64 {
    let clearance = obstacle.clearance(point);

    if clearance <= 0.0 {
        1.0
    }
    else if influence_distance > 0.0 && clearance < influence_distance {
        lin_map((0.0, influence_distance), (1.0, 0.0), clearance)
    }
    else {
        0.0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_danger_lookup() {
        let map = DangerMap::parse("0.0 0.1 0.2\n0.3 0.4 0.5\n", 10.0).unwrap();

        assert_eq!(map.num_cells(), (3, 2));
        assert_eq!(map.danger(&Point2D::new(0.0, 0.0)), 0.0);
        assert_eq!(map.danger(&Point2D::new(25.0, 5.0)), 0.2);
        assert_eq!(map.danger(&Point2D::new(10.0, 10.0)), 0.4);
        assert_eq!(map.danger(&Point2D::new(29.99, 19.99)), 0.5);

        // Outside the map is safe
        assert_eq!(map.danger(&Point2D::new(30.0, 5.0)), 0.0);
        assert_eq!(map.danger(&Point2D::new(5.0, 20.0)), 0.0);
        assert_eq!(map.danger(&Point2D::new(-0.1, 5.0)), 0.0);
        assert_eq!(map.danger(&Point2D::new(f64::NAN, 5.0)), 0.0);
    }

    #[test]
    fn test_parse_clamps_values() {
        let map = DangerMap::parse("-1 2\n0.5 1\n", 1.0).unwrap();
        assert_eq!(map.get(0, 0), Some(0.0));
        assert_eq!(map.get(1, 0), Some(1.0));
        assert_eq!(map.get(0, 1), Some(0.5));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DangerMap::parse("0 0 0\n\n0 0\n", 1.0),
            Err(MapError::RaggedDangerMap { line: 3, expected: 3, found: 2 })
        ));
        assert!(matches!(
            DangerMap::parse("0 x\n", 1.0),
            Err(MapError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            DangerMap::parse("0 inf\n", 1.0),
            Err(MapError::Parse { line: 1, .. })
        ));
        assert!(matches!(DangerMap::parse("\n# nothing\n", 1.0), Err(MapError::EmptyDangerMap)));
        assert!(matches!(DangerMap::parse("0 1\n", 0.0), Err(MapError::InvalidCellSize(_))));
    }

    #[test]
    fn test_from_obstacles() {
        let obstacles = vec![Obstacle::new(Point2D::new(50.0, 50.0), 10.0)];
        let map = DangerMap::from_obstacles(&obstacles, Point2D::new(100.0, 100.0), 10.0, 20.0)
            .unwrap();

        assert_eq!(map.num_cells(), (10, 10));

        // Cell centred on (55, 55) is inside the obstacle
        assert_eq!(map.danger(&Point2D::new(55.0, 55.0)), 1.0);

        // Cell centred on (75, 55) is 25.5 from the centre, 15.5 from the
        // edge
        let expected = 1.0 - ((25.0f64.powi(2) + 5.0f64.powi(2)).sqrt() - 10.0) / 20.0;
        assert!((map.danger(&Point2D::new(75.0, 55.0)) - expected).abs() < 1e-12);

        // Far away cells have no danger
        assert_eq!(map.danger(&Point2D::new(5.0, 95.0)), 0.0);
    }

    #[test]
    fn test_save_load() {
        let path = std::env::temp_dir().join("nav_map_danger_save_load.txt");
        let map = DangerMap::from_rows(vec![vec![0.0, 0.125], vec![1.0, 0.3]], 5.0).unwrap();

        map.save(&path).unwrap();
        assert_eq!(DangerMap::load(&path, 5.0).unwrap(), map);
    }

    #[test]
    fn test_zeros() {
        let map = DangerMap::zeros();
        assert_eq!(map.num_cells(), (0, 0));
        assert_eq!(map.danger(&Point2D::new(1.0, 1.0)), 0.0);
        assert_eq!(map.get(0, 0), None);

        // The file format can't hold an empty grid
        let path = std::env::temp_dir().join("nav_map_danger_save_zeros.txt");
        assert!(matches!(map.save(&path), Err(MapError::EmptyDangerMap)));
    }

    #[test]
    fn test_non_square_indexing() {
        // 3 columns, 2 rows, so a transposed lookup would go wrong
        let map = DangerMap::from_rows(vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]], 1.0)
            .unwrap();

        assert_eq!(map.position_to_cell(&Point2D::new(2.5, 1.5)), Some((2, 1)));
        assert_eq!(map.position_to_cell(&Point2D::new(1.5, 2.5)), None);
        assert_eq!(map.get(2, 1), Some(0.6));
        assert_eq!(map.get(1, 2), None);
    }
}
