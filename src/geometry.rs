//! Planar geometry used by the graph builders.
//!
//! All obstacles are axis-aligned rectangles, so blocking is a two-stage
//! test: a bounding-box reject followed by an exact edge-crossing check.

use serde::{Deserialize, Serialize};

/// Determinant magnitude below which two segments count as parallel.
const PARALLEL_EPSILON: f64 = 1e-10;

/// A point on the warehouse floor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its center and extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Point,
    pub width: f64,
    pub depth: f64,
}

impl Rect {
    pub fn new(center: Point, width: f64, depth: f64) -> Self {
        Self { center, width, depth }
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            center: self.center,
            width: self.width + 2.0 * margin,
            depth: self.depth + 2.0 * margin,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.center.x - self.width / 2.0
    }

    pub fn max_x(&self) -> f64 {
        self.center.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.center.y - self.depth / 2.0
    }

    pub fn max_y(&self) -> f64 {
        self.center.y + self.depth / 2.0
    }

    /// Boundary-inclusive containment.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    /// The four corners in counter-clockwise order starting bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }

    /// Whether the segment p1-p2 touches this rectangle.
    pub fn blocks(&self, p1: Point, p2: Point) -> bool {
        if self.contains(p1) || self.contains(p2) {
            return true;
        }

        let seg_min_x = p1.x.min(p2.x);
        let seg_max_x = p1.x.max(p2.x);
        let seg_min_y = p1.y.min(p2.y);
        let seg_max_y = p1.y.max(p2.y);

        if seg_max_x < self.min_x()
            || seg_min_x > self.max_x()
            || seg_max_y < self.min_y()
            || seg_min_y > self.max_y()
        {
            return false;
        }

        let corners = self.corners();
        (0..4).any(|k| segments_intersect(p1, p2, corners[k], corners[(k + 1) % 4]))
    }
}

/// Euclidean distance.
pub fn distance(p1: Point, p2: Point) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Parametric segment intersection. Parallel and near-parallel segments
/// never intersect.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let dax = a2.x - a1.x;
    let day = a2.y - a1.y;
    let dbx = b2.x - b1.x;
    let dby = b2.y - b1.y;

    let det = dax * dby - day * dbx;
    if det.abs() < PARALLEL_EPSILON {
        return false;
    }

    let ox = b1.x - a1.x;
    let oy = b1.y - a1.y;
    let t = (ox * dby - oy * dbx) / det;
    let u = (ox * day - oy * dax) / det;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// True if the segment p1-p2 enters the rectangle at `center` with the
/// given extents.
pub fn segment_blocked_by_rectangle(
    p1: Point,
    p2: Point,
    center: Point,
    width: f64,
    depth: f64,
) -> bool {
    Rect::new(center, width, depth).blocks(p1, p2)
}

/// True if any obstacle, grown by `clearance`, blocks the segment.
pub fn segment_blocked(p1: Point, p2: Point, obstacles: &[Rect], clearance: f64) -> bool {
    obstacles
        .iter()
        .any(|obstacle| obstacle.expanded(clearance).blocks(p1, p2))
}
