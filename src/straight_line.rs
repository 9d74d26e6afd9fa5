//! Straight-line path provider (fallback when no routing graph is built).
//!
//! Treats every pair of points as directly connected. Ignores racks and
//! obstacles, so it underestimates real walking distance, but it is always
//! available and handy for sizing a pick list before a layout exists.

use indexmap::IndexMap;

use crate::geometry::{Point, distance};
use crate::traits::{Leg, PathProvider};

/// Fully connected metric over named points.
#[derive(Debug, Clone, Default)]
pub struct StraightLineMetric {
    points: IndexMap<String, Point>,
}

impl StraightLineMetric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or move a named point.
    pub fn insert(&mut self, id: impl Into<String>, point: Point) {
        self.points.insert(id.into(), point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Point)> for StraightLineMetric {
    fn from_iter<I: IntoIterator<Item = (S, Point)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(|(id, p)| (id.into(), p)).collect(),
        }
    }
}

impl PathProvider for StraightLineMetric {
    fn contains(&self, id: &str) -> bool {
        self.points.contains_key(id)
    }

    fn matrix_for(&self, waypoints: &[&str]) -> Vec<Vec<Option<f64>>> {
        let n = waypoints.len();
        let mut matrix = vec![vec![None; n]; n];

        for (i, from) in waypoints.iter().enumerate() {
            for (j, to) in waypoints.iter().enumerate() {
                if let (Some(a), Some(b)) = (self.points.get(*from), self.points.get(*to)) {
                    matrix[i][j] = Some(if i == j { 0.0 } else { distance(*a, *b) });
                }
            }
        }

        matrix
    }

    fn path_between(&self, from: &str, to: &str) -> Option<Leg> {
        let a = self.points.get(from)?;
        let b = self.points.get(to)?;
        let nodes = if from == to {
            vec![from.to_string()]
        } else {
            vec![from.to_string(), to.to_string()]
        };
        Some(Leg {
            nodes,
            distance: distance(*a, *b),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> StraightLineMetric {
        [
            ("S", Point::new(0.0, 0.0)),
            ("P1", Point::new(10.0, 0.0)),
            ("P2", Point::new(10.0, 10.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_matrix_diagonal_is_zero() {
        let metric = square();
        let matrix = metric.matrix_for(&["S", "P1", "P2"]);

        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row[i], Some(0.0), "Diagonal should be zero");
        }
    }

    #[test]
    fn test_matrix_symmetric() {
        let metric = square();
        let matrix = metric.matrix_for(&["S", "P2"]);
        assert_eq!(matrix[0][1], matrix[1][0], "Matrix should be symmetric");
    }

    #[test]
    fn test_unknown_point_has_no_distance() {
        let metric = square();
        let matrix = metric.matrix_for(&["S", "missing"]);
        assert_eq!(matrix[0][1], None);
        assert!(metric.path_between("S", "missing").is_none());
    }

    #[test]
    fn test_path_is_direct() {
        let leg = square().path_between("S", "P1").unwrap();
        assert_eq!(leg.nodes, vec!["S", "P1"]);
        assert_eq!(leg.distance, 10.0);
    }
}
