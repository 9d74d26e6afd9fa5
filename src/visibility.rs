//! Line-of-sight graph builder for physical layouts.
//!
//! Nodes are pick points and the centers of walkable structures. Any two
//! nodes within range are linked unless a solid structure, grown by the
//! clearance margin, sits between them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LayoutError;
use crate::geometry::{Rect, distance, segment_blocked};
use crate::graph::{GraphNode, RoutingGraph};
use crate::layout::{LocationKind, Structure, validate_structures};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Longest direct edge between two nodes.
    pub max_connection_dist: f64,
    /// Margin added around every solid structure.
    pub clearance: f64,
    pub ensure_connectivity: bool,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            max_connection_dist: 30.0,
            clearance: 0.1,
            ensure_connectivity: true,
        }
    }
}

/// Node list for a physical layout: every pick point, then every walkable
/// structure center, in structure order.
pub fn visibility_nodes(structures: &[Structure]) -> Vec<GraphNode> {
    let mut nodes = Vec::new();

    for structure in structures {
        for pick in &structure.pick_points {
            let position = structure.pick_position(pick);
            let mut node = GraphNode::new(pick.id.clone(), position, LocationKind::Pick);
            node.zone = Some(structure.id.clone());
            nodes.push(node);
        }
        if structure.traversable {
            nodes.push(GraphNode::new(structure.id.clone(), structure.center, structure.kind));
        }
    }

    nodes
}

/// Build the routing graph for a physical layout.
pub fn build_visibility_graph(
    structures: &[Structure],
    config: &VisibilityConfig,
) -> Result<RoutingGraph, LayoutError> {
    validate_structures(structures)?;

    let obstacles: Vec<Rect> = structures
        .iter()
        .filter(|s| !s.traversable)
        .map(Structure::rect)
        .collect();

    let mut graph = RoutingGraph::new();
    let nodes = visibility_nodes(structures);
    let indices: Vec<_> = nodes.into_iter().map(|node| graph.add_node(node)).collect();

    info!(
        nodes = indices.len(),
        obstacles = obstacles.len(),
        "Building visibility graph"
    );

    let mut blocked = 0;
    for (i, &a) in indices.iter().enumerate() {
        for &b in &indices[i + 1..] {
            let (pa, pb) = (graph.node_at(a).position, graph.node_at(b).position);
            if distance(pa, pb) > config.max_connection_dist {
                continue;
            }
            if segment_blocked(pa, pb, &obstacles, config.clearance) {
                blocked += 1;
                continue;
            }
            graph.connect_indices(a, b);
        }
    }
    debug!(edges = graph.edge_count(), blocked, "Line-of-sight edges");

    if config.ensure_connectivity {
        let report = graph.repair_connectivity(|a, b| {
            !segment_blocked(a.position, b.position, &obstacles, config.clearance)
        });
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
        "Built visibility graph"
    );

    Ok(graph)
}
