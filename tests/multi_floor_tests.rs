//! Multi-floor routing tests
//!
//! Floor tagging, unified graph construction, and the unified versus
//! per-floor strategies on a two-floor warehouse.

mod fixtures;

use approx::assert_relative_eq;
use fixtures::*;
use pick_planner::config::{DEFAULT_INTER_FLOOR_PENALTY, PlannerConfig};
use pick_planner::error::{LayoutError, RouteError};
use pick_planner::layout::{Layout, Location, LocationKind};
use pick_planner::multi_floor::{MultiFloorWarehouse, TransitionKind, transition_points};
use pick_planner::solver::SolveOptions;

// ============================================================================
// Helper Functions
// ============================================================================

/// Staging_1 to the nearest bin and back.
fn one_pick_round_trip() -> f64 {
    2.0 * 200.0_f64.sqrt()
}

fn warehouse(layouts: &[Layout]) -> MultiFloorWarehouse {
    MultiFloorWarehouse::new(layouts, &PlannerConfig::default()).unwrap()
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_floor_ids_are_tagged() {
    let building = warehouse(&two_floors());

    assert_eq!(building.floors().len(), 2);
    let first = building.floor(1).unwrap();
    let second = building.floor(2).unwrap();

    assert!(first.graph.node("F1_Staging_1").is_some());
    assert!(first.graph.node("F1_A1-1").is_some());
    assert!(first.graph.node("Staging_1").is_none());
    assert!(second.graph.node("F2_C1-1").is_some());
    assert_eq!(first.access_point(), Some("F1_Staging_1"));
    assert_eq!(second.access_point(), Some("F2_Staging_1"));
}

#[test]
fn test_empty_building_rejected() {
    let err = MultiFloorWarehouse::new(&[], &PlannerConfig::default()).unwrap_err();
    assert_eq!(err, LayoutError::EmptyLayout);
}

#[test]
fn test_resolve_finds_floor() {
    let building = warehouse(&two_floors());

    assert_eq!(building.resolve("A1-1").as_deref(), Some("F1_A1-1"));
    assert_eq!(building.resolve("C1-1").as_deref(), Some("F2_C1-1"));
    assert_eq!(building.resolve("F2_D1-1").as_deref(), Some("F2_D1-1"));
    // Both floors have a staging area; the lower one wins
    assert_eq!(building.resolve("Staging_1").as_deref(), Some("F1_Staging_1"));
    assert_eq!(building.resolve("Z9"), None);
}

#[test]
fn test_unified_graph_links_access_points() {
    let mut building = warehouse(&two_floors());
    let floor_edges: usize = building.floors().iter().map(|f| f.graph.edge_count()).sum();

    let graph = building.build_unified(&[]);

    assert_eq!(graph.node_count(), 8);
    assert_eq!(graph.edge_count(), floor_edges + 1);
    assert_eq!(
        graph.edge_weight("F1_Staging_1", "F2_Staging_1"),
        Some(DEFAULT_INTER_FLOOR_PENALTY)
    );
    assert!(graph.is_connected());
}

#[test]
fn test_unified_graph_links_stairwell() {
    let layouts = two_floors_with_stairs();
    let points = transition_points(&layouts);

    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.kind == TransitionKind::Stair && p.id == "Stair_1"));

    let mut building = warehouse(&layouts);
    let graph = building.build_unified(&points);

    assert!(graph.has_edge("F1_Stair_1", "F2_Stair_1"));
    assert!(!graph.has_edge("F1_Staging_1", "F2_Staging_1"), "Stairs replace the staging link");
}

// ============================================================================
// Strategy Tests
// ============================================================================

#[test]
fn test_unified_route_pays_penalty_each_way() {
    let mut building = warehouse(&two_floors());
    building.build_unified(&[]);

    let result = building
        .solve_unified(&ids(&["A1-1", "C1-1"]), None, None, &SolveOptions::default())
        .unwrap();

    assert_eq!(result.route.nodes.first().map(String::as_str), Some("F1_Staging_1"));
    assert_eq!(result.route.nodes.last().map(String::as_str), Some("F1_Staging_1"));
    assert_eq!(result.transitions.count, 2);
    assert_eq!(result.transitions.floors_visited, vec![1, 2]);
    assert!(result.floor_routes.is_empty());
    assert_relative_eq!(
        result.route.distance,
        2.0 * one_pick_round_trip() + 2.0 * DEFAULT_INTER_FLOOR_PENALTY,
        epsilon = 1e-6
    );
}

#[test]
fn test_per_floor_route_chains_floors() {
    let building = warehouse(&two_floors());

    let result = building
        .solve_per_floor(&ids(&["C1-1", "A1-1"]), &SolveOptions::default())
        .unwrap();

    assert_eq!(result.floor_routes.len(), 2);
    assert_eq!(result.floor_routes[0].floor, 1);
    assert_eq!(result.floor_routes[1].floor, 2);
    assert_eq!(result.route.picks, vec!["F1_A1-1", "F2_C1-1"]);
    assert_eq!(result.transitions.count, 1);
    assert_eq!(result.transitions.transitions, vec![(1, 2)]);
    assert_relative_eq!(
        result.route.distance,
        2.0 * one_pick_round_trip() + DEFAULT_INTER_FLOOR_PENALTY,
        epsilon = 1e-6
    );
}

#[test]
fn test_per_floor_single_floor_has_no_penalty() {
    let building = warehouse(&two_floors());

    let result = building
        .solve_per_floor(&ids(&["A1-1"]), &SolveOptions::default())
        .unwrap();

    assert_eq!(result.transitions.count, 0);
    assert_relative_eq!(result.route.distance, one_pick_round_trip(), epsilon = 1e-6);
}

#[test]
fn test_penalty_is_configurable() {
    let config = PlannerConfig::default().with_inter_floor_penalty(50.0);
    let building = MultiFloorWarehouse::new(&two_floors(), &config).unwrap();

    assert_relative_eq!(building.inter_floor_penalty(), 50.0);
    let result = building
        .solve_per_floor(&ids(&["A1-1", "C1-1"]), &SolveOptions::default())
        .unwrap();
    assert_relative_eq!(result.route.distance, 2.0 * one_pick_round_trip() + 50.0, epsilon = 1e-6);
}

#[test]
fn test_compare_prefers_per_floor() {
    let mut building = warehouse(&two_floors());
    building.build_unified(&[]);

    let comparison = building.compare_strategies(&ids(&["A1-1", "C1-1"]), &SolveOptions::default());
    let unified = comparison.unified.as_ref().unwrap();
    let per_floor = comparison.per_floor.as_ref().unwrap();

    assert!(per_floor.route.distance < unified.route.distance);
    assert_eq!(comparison.best(), Some(per_floor));
}

#[test]
fn test_stairwell_route_crosses_at_stairs() {
    let layouts = two_floors_with_stairs();
    let points = transition_points(&layouts);
    let mut building = warehouse(&layouts);
    building.build_unified(&points);

    let result = building
        .solve_unified(&ids(&["A1-2", "C1-2"]), None, None, &SolveOptions::default())
        .unwrap();

    assert_eq!(result.transitions.count, 2);
    assert!(result.route.nodes.iter().any(|n| n == "F1_Stair_1"));
    assert!(result.route.nodes.iter().any(|n| n == "F2_Stair_1"));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_unified_requires_built_graph() {
    let building = warehouse(&two_floors());

    let err = building
        .solve_unified(&ids(&["A1-1"]), None, None, &SolveOptions::default())
        .unwrap_err();
    assert_eq!(err, RouteError::GraphNotBuilt);

    let comparison = building.compare_strategies(&ids(&["A1-1"]), &SolveOptions::default());
    assert!(comparison.unified.is_err());
    assert_eq!(comparison.best(), comparison.per_floor.as_ref().ok());
}

#[test]
fn test_floor_without_access_point() {
    let upper = vec![
        Location::new("M1", 0.0, 0.0, LocationKind::Pick),
        Location::new("M2", 0.0, 10.0, LocationKind::Pick),
    ];
    let building = warehouse(&[
        Layout::Clustered(floor_layout("A", "B")),
        Layout::Clustered(upper),
    ]);

    let err = building
        .solve_per_floor(&ids(&["A1-1", "M1"]), &SolveOptions::default())
        .unwrap_err();
    assert_eq!(err, RouteError::NoAccessPoint { floor: 2 });
}

#[test]
fn test_unknown_pick_skipped_when_first_floor_idle() {
    let building = warehouse(&two_floors());

    let result = building
        .solve_per_floor(&ids(&["C1-1", "Z9"]), &SolveOptions::default())
        .unwrap();

    assert_eq!(result.floor_routes.len(), 1);
    assert_eq!(result.floor_routes[0].floor, 2);
    assert_eq!(result.route.picks, vec!["F2_C1-1"]);
    assert_eq!(result.transitions.count, 0);
    assert_relative_eq!(result.route.distance, one_pick_round_trip(), epsilon = 1e-6);
}

#[test]
fn test_unknown_picks_only() {
    let building = warehouse(&two_floors());

    let err = building
        .solve_per_floor(&ids(&["Z9"]), &SolveOptions::default())
        .unwrap_err();
    assert_eq!(err, RouteError::NoPicks);
}
