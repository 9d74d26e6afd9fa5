//! Warehouse layout records.
//!
//! Two layout shapes are supported: flat location lists, routed by
//! clustering inferred aisles, and structure lists with footprints and pick
//! point offsets, routed by line of sight. The shape is chosen once when the
//! layout is loaded.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::{Point, Rect};

/// Semantic type of a location or structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[serde(alias = "picking")]
    Pick,
    #[serde(alias = "aisle_waypoint")]
    Aisle,
    Staging,
    Dock,
    Obstacle,
    Intersection,
    CrossAisle,
    Rack,
    Stair,
    Elevator,
    #[serde(other)]
    Other,
}

impl LocationKind {
    /// Staging and dock areas are where a picker enters a floor.
    pub fn is_access(&self) -> bool {
        matches!(self, LocationKind::Staging | LocationKind::Dock)
    }
}

/// Rectangular extent of a location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f64,
    pub depth: f64,
}

fn default_traversable() -> bool {
    true
}

/// A single point of interest on the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default = "default_traversable")]
    pub traversable: bool,
}

impl Location {
    pub fn new(id: impl Into<String>, x: f64, y: f64, kind: LocationKind) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            kind,
            zone: None,
            width: None,
            depth: None,
            traversable: true,
        }
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_footprint(mut self, width: f64, depth: f64) -> Self {
        self.width = Some(width);
        self.depth = Some(depth);
        self
    }

    /// Mark as a non-traversable obstacle.
    pub fn blocked(mut self) -> Self {
        self.traversable = false;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Footprint, with missing sides treated as zero.
    pub fn footprint(&self) -> Footprint {
        Footprint {
            width: self.width.unwrap_or(0.0),
            depth: self.depth.unwrap_or(0.0),
        }
    }

    /// Obstacle rectangle before clearance.
    pub fn rect(&self) -> Rect {
        let footprint = self.footprint();
        Rect::new(self.position(), footprint.width, footprint.depth)
    }
}

/// A pick point declared relative to its structure's center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickPoint {
    pub id: String,
    pub offset: Point,
}

/// A physical object with a rectangular footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: String,
    pub center: Point,
    pub width: f64,
    pub depth: f64,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    #[serde(default)]
    pub traversable: bool,
    #[serde(default)]
    pub pick_points: Vec<PickPoint>,
}

impl Structure {
    pub fn new(
        id: impl Into<String>,
        center: Point,
        width: f64,
        depth: f64,
        kind: LocationKind,
    ) -> Self {
        Self {
            id: id.into(),
            center,
            width,
            depth,
            kind,
            traversable: false,
            pick_points: Vec::new(),
        }
    }

    pub fn walkable(mut self) -> Self {
        self.traversable = true;
        self
    }

    pub fn with_pick_point(mut self, id: impl Into<String>, dx: f64, dy: f64) -> Self {
        self.pick_points.push(PickPoint {
            id: id.into(),
            offset: Point::new(dx, dy),
        });
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.center, self.width, self.depth)
    }

    /// Absolute position of a pick point.
    pub fn pick_position(&self, pick: &PickPoint) -> Point {
        Point::new(self.center.x + pick.offset.x, self.center.y + pick.offset.y)
    }
}

/// A loaded layout, tagged by the builder that routes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Layout {
    Clustered(Vec<Location>),
    Physical(Vec<Structure>),
}

impl Layout {
    /// Reject layouts the builders cannot work with.
    pub fn validate(&self) -> Result<(), LayoutError> {
        match self {
            Layout::Clustered(locations) => validate_locations(locations),
            Layout::Physical(structures) => validate_structures(structures),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Layout::Clustered(locations) => locations.is_empty(),
            Layout::Physical(structures) => structures.is_empty(),
        }
    }
}

fn check_side(id: &str, side: Option<f64>) -> Result<(), LayoutError> {
    match side {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(LayoutError::InvalidFootprint { id: id.to_string() })
        }
        _ => Ok(()),
    }
}

pub fn validate_locations(locations: &[Location]) -> Result<(), LayoutError> {
    if locations.is_empty() {
        return Err(LayoutError::EmptyLayout);
    }

    let mut seen = HashSet::new();
    for location in locations {
        if !location.position().is_finite() {
            return Err(LayoutError::NonFiniteCoordinate {
                id: location.id.clone(),
            });
        }
        check_side(&location.id, location.width)?;
        check_side(&location.id, location.depth)?;
        if !seen.insert(location.id.as_str()) {
            return Err(LayoutError::DuplicateId(location.id.clone()));
        }
    }

    Ok(())
}

/// Structure ids and pick point ids share one namespace, since both become
/// graph nodes.
pub fn validate_structures(structures: &[Structure]) -> Result<(), LayoutError> {
    if structures.is_empty() {
        return Err(LayoutError::EmptyLayout);
    }

    let mut seen = HashSet::new();
    for structure in structures {
        if !structure.center.is_finite() {
            return Err(LayoutError::NonFiniteCoordinate {
                id: structure.id.clone(),
            });
        }
        check_side(&structure.id, Some(structure.width))?;
        check_side(&structure.id, Some(structure.depth))?;
        if !seen.insert(structure.id.as_str()) {
            return Err(LayoutError::DuplicateId(structure.id.clone()));
        }

        for pick in &structure.pick_points {
            if !pick.offset.is_finite() {
                return Err(LayoutError::NonFiniteCoordinate { id: pick.id.clone() });
            }
            if !seen.insert(pick.id.as_str()) {
                return Err(LayoutError::DuplicateId(pick.id.clone()));
            }
        }
    }

    Ok(())
}
