//! Warehouse layouts for integration tests.

use pick_planner::geometry::Point;
use pick_planner::layout::{Layout, Location, LocationKind, Structure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Record-file layouts
// ============================================================================

/// Small clustered warehouse, as it would arrive from a layout file.
pub const SMALL_WAREHOUSE_JSON: &str = r#"[
    {"id": "Staging_1", "x": 10, "y": 10, "type": "staging", "zone": "receiving",
     "width": 8, "depth": 6, "traversable": true},
    {"id": "A1-1", "x": 20, "y": 20, "type": "picking", "zone": "A", "width": 2, "depth": 2, "traversable": true},
    {"id": "A1-2", "x": 20, "y": 30, "type": "picking", "zone": "A", "width": 2, "depth": 2, "traversable": true},
    {"id": "A2-1", "x": 30, "y": 20, "type": "picking", "zone": "A", "width": 2, "depth": 2, "traversable": true},
    {"id": "A2-2", "x": 30, "y": 30, "type": "picking", "zone": "A", "width": 2, "depth": 2, "traversable": true},
    {"id": "B1-1", "x": 45, "y": 20, "type": "picking", "zone": "B", "width": 2, "depth": 2, "traversable": true},
    {"id": "B1-2", "x": 45, "y": 30, "type": "picking", "zone": "B", "width": 2, "depth": 2, "traversable": true},
    {"id": "CrossAisle_1", "x": 35, "y": 25, "type": "intersection", "zone": "cross_aisle",
     "width": 6, "depth": 6, "traversable": true},
    {"id": "Obstacle_1", "x": 50, "y": 50, "type": "obstacle", "zone": "blocked",
     "width": 10, "depth": 10, "traversable": false}
]"#;

pub fn small_warehouse() -> Vec<Location> {
    serde_json::from_str(SMALL_WAREHOUSE_JSON).expect("fixture parses")
}

/// One floor of the two-floor fixture. Both floors share ids, as real
/// per-floor files do.
pub fn floor_layout(zone_a: &str, zone_b: &str) -> Vec<Location> {
    vec![
        Location::new("Staging_1", 10.0, 10.0, LocationKind::Staging)
            .with_zone("receiving")
            .with_footprint(8.0, 6.0),
        Location::new(format!("{zone_a}1-1"), 20.0, 20.0, LocationKind::Pick).with_zone(zone_a),
        Location::new(format!("{zone_a}1-2"), 20.0, 30.0, LocationKind::Pick).with_zone(zone_a),
        Location::new(format!("{zone_b}1-1"), 35.0, 20.0, LocationKind::Pick).with_zone(zone_b),
    ]
}

pub fn two_floors() -> Vec<Layout> {
    vec![
        Layout::Clustered(floor_layout("A", "B")),
        Layout::Clustered(floor_layout("C", "D")),
    ]
}

/// Two floors joined by a stairwell at the west wall.
pub fn two_floors_with_stairs() -> Vec<Layout> {
    [("A", "B"), ("C", "D")]
        .into_iter()
        .map(|(a, b)| {
            let mut floor = floor_layout(a, b);
            floor.push(Location::new("Stair_1", 5.0, 30.0, LocationKind::Stair));
            Layout::Clustered(floor)
        })
        .collect()
}

/// Physical layout: a dock, one double-sided rack, and walkable cross
/// aisles past both rack ends.
pub fn physical_warehouse() -> Vec<Structure> {
    vec![
        Structure::new("Dock", Point::new(10.0, 8.0), 8.0, 6.0, LocationKind::Staging).walkable(),
        Structure::new("Rack_A", Point::new(40.0, 30.0), 3.0, 20.0, LocationKind::Rack)
            .with_pick_point("A-W1", -3.0, -8.0)
            .with_pick_point("A-W2", -3.0, 0.0)
            .with_pick_point("A-W3", -3.0, 8.0)
            .with_pick_point("A-E1", 3.0, -8.0)
            .with_pick_point("A-E2", 3.0, 0.0)
            .with_pick_point("A-E3", 3.0, 8.0),
        Structure::new("South_Aisle", Point::new(40.0, 8.0), 40.0, 4.0, LocationKind::Aisle)
            .walkable(),
        Structure::new("North_Aisle", Point::new(40.0, 52.0), 40.0, 4.0, LocationKind::Aisle)
            .walkable(),
    ]
}

// ============================================================================
// Scenario layouts
// ============================================================================

/// Two racks facing each other 12 apart, five bins each, with walkways
/// past the north and south ends.
pub fn rack_pair() -> Vec<Location> {
    let mut locations = Vec::new();
    for (k, y) in [0.0, 10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
        locations.push(Location::new(format!("L{k}"), 0.0, y, LocationKind::Pick));
        locations.push(Location::new(format!("R{k}"), 12.0, y, LocationKind::Pick));
    }
    locations.push(Location::new("N", 6.0, -8.0, LocationKind::Aisle));
    locations.push(Location::new("S", 6.0, 48.0, LocationKind::Aisle));
    locations
}

/// Three picks on one horizontal aisle with a pillar between the last two
/// and a detour waypoint above it.
pub fn blocked_aisle() -> Vec<Location> {
    vec![
        Location::new("W", -10.0, 0.0, LocationKind::Aisle),
        Location::new("P1", 0.0, 0.0, LocationKind::Pick),
        Location::new("P2", 20.0, 0.0, LocationKind::Pick),
        Location::new("D", 10.0, 10.0, LocationKind::Aisle),
        Location::new("Pillar", 10.0, 0.0, LocationKind::Obstacle)
            .with_footprint(4.0, 4.0)
            .blocked(),
    ]
}

/// Two triangles of nodes far apart, none on a common aisle.
pub fn split_clusters() -> Vec<Location> {
    vec![
        Location::new("a1", 0.0, 0.0, LocationKind::Pick),
        Location::new("a2", 6.0, 7.0, LocationKind::Pick),
        Location::new("a3", 13.0, 1.0, LocationKind::Pick),
        Location::new("b1", 100.0, 50.0, LocationKind::Pick),
        Location::new("b2", 106.0, 57.0, LocationKind::Pick),
        Location::new("b3", 113.0, 51.0, LocationKind::Pick),
    ]
}

// ============================================================================
// Random layouts
// ============================================================================

/// Scattered picks with a staging area in the corner and a few pillars.
pub fn random_warehouse(seed: u64, picks: usize, pillars: usize) -> Vec<Location> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut locations = vec![Location::new("Staging", 0.0, 0.0, LocationKind::Staging)];

    for k in 0..picks {
        let x = rng.gen_range(5.0..100.0);
        let y = rng.gen_range(5.0..100.0);
        locations.push(Location::new(format!("P{k:02}"), x, y, LocationKind::Pick));
    }

    for k in 0..pillars {
        let x = rng.gen_range(10.0..90.0);
        let y = rng.gen_range(10.0..90.0);
        locations.push(
            Location::new(format!("Pillar{k}"), x, y, LocationKind::Obstacle)
                .with_footprint(2.0, 2.0)
                .blocked(),
        );
    }

    locations
}

pub fn pick_ids(locations: &[Location]) -> Vec<String> {
    locations
        .iter()
        .filter(|l| l.kind == LocationKind::Pick)
        .map(|l| l.id.clone())
        .collect()
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
