//! Routing graph builder for clustered layouts.
//!
//! Edges are generated in a fixed order: consecutive members of each aisle,
//! cross-aisle links between intersection nodes, nearest-neighbour links for
//! nodes outside every aisle, then connectivity repair. Every candidate edge
//! must keep clear of obstacles and must not cut straight across a rack pair.

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geometry::{Point, Rect, distance, segment_blocked};
use crate::graph::{GraphNode, RoutingGraph};
use crate::inference::AnnotatedLocation;

/// Neighbours linked to each node that sits outside every aisle.
const ISOLATED_NEIGHBOURS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Longest edge between consecutive members of one aisle.
    pub max_intra_aisle_dist: f64,
    /// Longest edge between intersection nodes of different aisles.
    pub max_cross_aisle_dist: f64,
    /// Margin added around every obstacle footprint.
    pub clearance: f64,
    /// How close to a rack pair's end both nodes must be to link across it.
    pub aisle_end_tolerance: f64,
    pub ensure_connectivity: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_intra_aisle_dist: 25.0,
            max_cross_aisle_dist: 25.0,
            clearance: 1.0,
            aisle_end_tolerance: 5.0,
            ensure_connectivity: true,
        }
    }
}

/// Physical constraints every edge must satisfy.
#[derive(Debug, Clone)]
pub(crate) struct EdgeRules {
    obstacles: Vec<Rect>,
    clearance: f64,
    /// Combined y extent of each rack and its partner.
    pair_extents: IndexMap<usize, (f64, f64)>,
    end_tolerance: f64,
}

impl EdgeRules {
    pub(crate) fn new(annotated: &[AnnotatedLocation], config: &BuilderConfig) -> Self {
        let obstacles = annotated
            .iter()
            .filter(|a| !a.location.traversable)
            .map(|a| a.location.rect())
            .collect();

        let mut rack_extents: IndexMap<usize, (f64, f64)> = IndexMap::new();
        for a in annotated {
            if let Some(rack) = a.rack.rack {
                let y = a.location.y;
                let extent = rack_extents.entry(rack).or_insert((y, y));
                extent.0 = extent.0.min(y);
                extent.1 = extent.1.max(y);
            }
        }

        let mut pair_extents = IndexMap::new();
        for a in annotated {
            if let (Some(rack), Some(partner)) = (a.rack.rack, a.rack.partner) {
                if pair_extents.contains_key(&rack) {
                    continue;
                }
                if let (Some(&(lo_a, hi_a)), Some(&(lo_b, hi_b))) =
                    (rack_extents.get(&rack), rack_extents.get(&partner))
                {
                    pair_extents.insert(rack, (lo_a.min(lo_b), hi_a.max(hi_b)));
                }
            }
        }

        Self {
            obstacles,
            clearance: config.clearance,
            pair_extents,
            end_tolerance: config.aisle_end_tolerance,
        }
    }

    pub(crate) fn obstacle_blocked(&self, p1: Point, p2: Point) -> bool {
        segment_blocked(p1, p2, &self.obstacles, self.clearance)
    }

    /// Opposite faces of one rack pair only connect around its ends.
    pub(crate) fn rack_blocked(&self, a: &GraphNode, b: &GraphNode) -> bool {
        if !a.rack.faces(&b.rack) {
            return false;
        }
        let Some(&(lo, hi)) = a.rack.rack.and_then(|rack| self.pair_extents.get(&rack)) else {
            return true;
        };

        let near = |y: f64, end: f64| (y - end).abs() <= self.end_tolerance;
        let (ya, yb) = (a.position.y, b.position.y);
        let at_low_end = near(ya, lo) && near(yb, lo);
        let at_high_end = near(ya, hi) && near(yb, hi);
        !(at_low_end || at_high_end)
    }

    pub(crate) fn allows(&self, a: &GraphNode, b: &GraphNode) -> bool {
        !self.rack_blocked(a, b) && !self.obstacle_blocked(a.position, b.position)
    }
}

#[derive(Debug, Default)]
struct EdgeTally {
    added: usize,
    too_long: usize,
    rack_blocked: usize,
    obstacle_blocked: usize,
}

impl EdgeTally {
    /// Apply all rules to a candidate and add it if it passes.
    fn try_connect(
        &mut self,
        graph: &mut RoutingGraph,
        rules: &EdgeRules,
        a: NodeIndex,
        b: NodeIndex,
        max_dist: f64,
    ) {
        let (na, nb) = (graph.node_at(a), graph.node_at(b));
        if rules.rack_blocked(na, nb) {
            self.rack_blocked += 1;
            return;
        }
        if distance(na.position, nb.position) > max_dist {
            self.too_long += 1;
            return;
        }
        if rules.obstacle_blocked(na.position, nb.position) {
            self.obstacle_blocked += 1;
            return;
        }
        if graph.connect_indices(a, b) {
            self.added += 1;
        }
    }
}

/// Build the routing graph for a clustered layout.
pub fn build_aisle_graph(annotated: &[AnnotatedLocation], config: &BuilderConfig) -> RoutingGraph {
    let rules = EdgeRules::new(annotated, config);
    let mut graph = RoutingGraph::new();

    let mut vertical: IndexMap<usize, Vec<NodeIndex>> = IndexMap::new();
    let mut horizontal: IndexMap<usize, Vec<NodeIndex>> = IndexMap::new();
    let mut intersections = Vec::new();
    let mut isolated = Vec::new();

    for a in annotated.iter().filter(|a| a.location.traversable) {
        let location = &a.location;
        let idx = graph.add_node(GraphNode {
            id: location.id.clone(),
            position: location.position(),
            kind: location.kind,
            zone: location.zone.clone(),
            aisle: a.aisle,
            rack: a.rack,
        });

        if let Some(aisle) = a.aisle.vertical {
            vertical.entry(aisle).or_default().push(idx);
        }
        if let Some(aisle) = a.aisle.horizontal {
            horizontal.entry(aisle).or_default().push(idx);
        }
        if a.aisle.is_intersection() {
            intersections.push(idx);
        }
        if a.aisle.is_isolated() {
            isolated.push(idx);
        }
    }

    info!(
        nodes = graph.node_count(),
        obstacles = rules.obstacles.len(),
        vertical_aisles = vertical.len(),
        horizontal_aisles = horizontal.len(),
        "Building aisle graph"
    );

    let mut intra = EdgeTally::default();
    for members in vertical.values_mut() {
        members.sort_by(|&a, &b| {
            let (pa, pb) = (graph.node_at(a).position, graph.node_at(b).position);
            pa.y.total_cmp(&pb.y)
        });
        for pair in members.windows(2) {
            intra.try_connect(&mut graph, &rules, pair[0], pair[1], config.max_intra_aisle_dist);
        }
    }
    for members in horizontal.values_mut() {
        members.sort_by(|&a, &b| {
            let (pa, pb) = (graph.node_at(a).position, graph.node_at(b).position);
            pa.x.total_cmp(&pb.x)
        });
        for pair in members.windows(2) {
            intra.try_connect(&mut graph, &rules, pair[0], pair[1], config.max_intra_aisle_dist);
        }
    }
    debug!(
        added = intra.added,
        too_long = intra.too_long,
        rack_blocked = intra.rack_blocked,
        obstacle_blocked = intra.obstacle_blocked,
        "Intra-aisle edges"
    );

    let mut cross = EdgeTally::default();
    for (i, &a) in intersections.iter().enumerate() {
        for &b in &intersections[i + 1..] {
            if graph.node_at(a).aisle.shares_aisle(&graph.node_at(b).aisle) {
                continue;
            }
            cross.try_connect(&mut graph, &rules, a, b, config.max_cross_aisle_dist);
        }
    }
    debug!(
        intersections = intersections.len(),
        added = cross.added,
        too_long = cross.too_long,
        rack_blocked = cross.rack_blocked,
        obstacle_blocked = cross.obstacle_blocked,
        "Cross-aisle edges"
    );

    stitch_isolated(&mut graph, &rules, &isolated);

    if config.ensure_connectivity {
        let report = graph.repair_connectivity(|a, b| rules.allows(a, b));
        debug!(
            bridges = report.bridges.len(),
            components = report.components,
            "Connectivity repair"
        );
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        components = graph.component_count(),
        "Built aisle graph"
    );

    graph
}

/// Link each node outside every aisle to its nearest reachable neighbours.
fn stitch_isolated(graph: &mut RoutingGraph, rules: &EdgeRules, isolated: &[NodeIndex]) {
    if isolated.is_empty() {
        return;
    }

    let tree = RTree::bulk_load(
        graph
            .nodes()
            .filter_map(|node| {
                let idx = graph.index_of(&node.id)?;
                Some(GeomWithData::new([node.position.x, node.position.y], idx))
            })
            .collect(),
    );

    let mut added = 0;
    for &idx in isolated {
        let origin = graph.node_at(idx).clone();
        let query = [origin.position.x, origin.position.y];

        let nearest: Vec<NodeIndex> = tree
            .nearest_neighbor_iter(&query)
            .map(|candidate| candidate.data)
            .filter(|&other| other != idx && rules.allows(&origin, graph.node_at(other)))
            .take(ISOLATED_NEIGHBOURS)
            .collect();

        for other in nearest {
            if graph.connect_indices(idx, other) {
                added += 1;
            }
        }
    }

    debug!(isolated = isolated.len(), added, "Stitched isolated nodes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceConfig, annotate};
    use crate::layout::{Location, LocationKind};

    fn build(locations: &[Location]) -> RoutingGraph {
        let annotated = annotate(locations, &InferenceConfig::default());
        build_aisle_graph(&annotated, &BuilderConfig::default())
    }

    #[test]
    fn test_vertical_aisle_links_consecutive_nodes() {
        let graph = build(&[
            Location::new("a", 0.0, 0.0, LocationKind::Aisle),
            Location::new("c", 0.0, 20.0, LocationKind::Aisle),
            Location::new("b", 0.0, 10.0, LocationKind::Aisle),
        ]);

        assert!(graph.has_edge("a", "b"));
        assert!(graph.has_edge("b", "c"));
        assert!(!graph.has_edge("a", "c"));
    }

    #[test]
    fn test_long_aisle_gap_is_bridged_by_repair() {
        let graph = build(&[
            Location::new("a", 0.0, 0.0, LocationKind::Aisle),
            Location::new("b", 0.0, 3.0, LocationKind::Aisle),
            Location::new("c", 0.0, 40.0, LocationKind::Aisle),
        ]);

        // 37 exceeds the intra-aisle limit, but repair still joins it
        assert!(graph.has_edge("b", "c"));
        assert!(graph.is_connected());
    }

    #[test]
    fn test_obstacle_is_not_a_node() {
        let graph = build(&[
            Location::new("a", 0.0, 0.0, LocationKind::Aisle),
            Location::new("b", 0.0, 10.0, LocationKind::Aisle),
            Location::new("wall", 30.0, 30.0, LocationKind::Obstacle)
                .with_footprint(4.0, 4.0)
                .blocked(),
        ]);

        assert!(graph.node("wall").is_none());
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_rack_rule_only_opens_at_aisle_end() {
        let annotated = annotate(
            &[
                Location::new("L1", 0.0, 0.0, LocationKind::Pick),
                Location::new("L2", 0.0, 20.0, LocationKind::Pick),
                Location::new("R1", 12.0, 0.0, LocationKind::Pick),
                Location::new("R2", 12.0, 20.0, LocationKind::Pick),
                Location::new("Lmid", 0.0, 10.0, LocationKind::Pick),
                Location::new("Rmid", 12.0, 10.0, LocationKind::Pick),
            ],
            &InferenceConfig::default(),
        );
        let rules = EdgeRules::new(&annotated, &BuilderConfig::default());
        let node = |i: usize| {
            let a = &annotated[i];
            GraphNode {
                id: a.location.id.clone(),
                position: a.location.position(),
                kind: a.location.kind,
                zone: None,
                aisle: a.aisle,
                rack: a.rack,
            }
        };

        assert!(!rules.rack_blocked(&node(0), &node(2)));
        assert!(!rules.rack_blocked(&node(1), &node(3)));
        assert!(rules.rack_blocked(&node(4), &node(5)));
        // One end each is still a shortcut through the shelf
        assert!(rules.rack_blocked(&node(0), &node(3)));
        // Same side is never rack blocked
        assert!(!rules.rack_blocked(&node(0), &node(4)));
    }
}
