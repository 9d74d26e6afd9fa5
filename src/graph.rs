//! Weighted routing graph over traversable locations.
//!
//! Nodes are addressed by their string id; edge weights are Euclidean
//! distances between node positions. Once a builder hands the graph out it is
//! only read, so many optimizations can share one graph across threads.

use indexmap::IndexMap;
use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{Point, distance};
use crate::inference::{AisleAnnotation, RackAnnotation};
use crate::layout::LocationKind;
use crate::traits::{Leg, PathProvider};

/// A routable node and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub position: Point,
    pub kind: LocationKind,
    pub zone: Option<String>,
    #[serde(default)]
    pub aisle: AisleAnnotation,
    #[serde(default)]
    pub rack: RackAnnotation,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, position: Point, kind: LocationKind) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
            zone: None,
            aisle: AisleAnnotation::default(),
            rack: RackAnnotation::default(),
        }
    }
}

/// Edge as exposed to renderers and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub distance: f64,
}

/// Serializable copy of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Quality metrics for a built graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub is_connected: bool,
    pub avg_degree: f64,
    /// Distinct racks among the graph's nodes.
    pub racks: usize,
    /// Racks paired across an aisle, counted once per pair.
    pub rack_pairs: usize,
}

/// Outcome of connectivity repair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepairReport {
    /// Bridging edges added, in order.
    pub bridges: Vec<GraphEdge>,
    /// Components left when repair finished.
    pub components: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    graph: UnGraph<GraphNode, f64>,
    index: IndexMap<String, NodeIndex>,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. An id that is already present keeps its first node.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&existing) = self.index.get(&node.id) {
            return existing;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Connect two nodes with their Euclidean distance. Returns false when
    /// either node is missing, the ends coincide, or the edge already exists.
    pub fn connect(&mut self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.connect_indices(ia, ib),
            _ => false,
        }
    }

    /// Connect two nodes with an explicit weight.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f64) -> bool {
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        if ia == ib || self.graph.contains_edge(ia, ib) {
            return false;
        }
        self.graph.add_edge(ia, ib, weight);
        true
    }

    pub(crate) fn connect_indices(&mut self, a: NodeIndex, b: NodeIndex) -> bool {
        if a == b || self.graph.contains_edge(a, b) {
            return false;
        }
        let weight = distance(self.graph[a].position, self.graph[b].position);
        self.graph.add_edge(a, b, weight);
        true
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.node(id).map(|n| n.position)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.contains_edge(ia, ib),
            _ => false,
        }
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let edge = self.graph.find_edge(ia, ib)?;
        self.graph.edge_weight(edge).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.index.values().map(|&idx| &self.graph[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.graph.edge_references().map(|edge| GraphEdge {
            from: self.graph[edge.source()].id.clone(),
            to: self.graph[edge.target()].id.clone(),
            distance: *edge.weight(),
        })
    }

    /// Ids adjacent to `id`.
    pub fn neighbours(&self, id: &str) -> Vec<&str> {
        match self.index.get(id) {
            Some(&idx) => self
                .graph
                .neighbors(idx)
                .map(|n| self.graph[n].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Copy every node and edge of `other` into this graph.
    pub fn absorb(&mut self, other: &RoutingGraph) {
        for node in other.nodes() {
            self.add_node(node.clone());
        }
        for edge in other.edges() {
            self.add_edge(&edge.from, &edge.to, edge.distance);
        }
    }

    /// Connected components as lists of node indices, ordered by their
    /// first inserted node.
    fn component_indices(&self) -> Vec<Vec<NodeIndex>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: IndexMap<usize, Vec<NodeIndex>> = IndexMap::new();
        for &idx in self.index.values() {
            groups.entry(sets.find(idx.index())).or_default().push(idx);
        }
        groups.into_values().collect()
    }

    /// Connected components as lists of node ids.
    pub fn components(&self) -> Vec<Vec<&str>> {
        self.component_indices()
            .into_iter()
            .map(|component| component.into_iter().map(|idx| self.graph[idx].id.as_str()).collect())
            .collect()
    }

    pub fn component_count(&self) -> usize {
        self.component_indices().len()
    }

    pub fn is_connected(&self) -> bool {
        self.component_count() <= 1
    }

    /// Bridge components until one remains or no acceptable pair is left.
    ///
    /// Each round adds the globally closest pair of nodes in distinct
    /// components that `is_valid` accepts, ignoring every distance threshold.
    pub fn repair_connectivity<F>(&mut self, is_valid: F) -> RepairReport
    where
        F: Fn(&GraphNode, &GraphNode) -> bool,
    {
        let mut components = self.component_indices();
        let mut report = RepairReport::default();

        if components.len() > 1 {
            debug!(components = components.len(), "Repairing disconnected graph");
        }

        while components.len() > 1 {
            let mut best: Option<(usize, usize, NodeIndex, NodeIndex, f64)> = None;

            for ci in 0..components.len() {
                for cj in ci + 1..components.len() {
                    for &a in &components[ci] {
                        for &b in &components[cj] {
                            let (na, nb) = (&self.graph[a], &self.graph[b]);
                            let d = distance(na.position, nb.position);
                            if best.is_some_and(|(.., best_d)| d >= best_d) {
                                continue;
                            }
                            if is_valid(na, nb) {
                                best = Some((ci, cj, a, b, d));
                            }
                        }
                    }
                }
            }

            let Some((ci, cj, a, b, d)) = best else {
                warn!(
                    components = components.len(),
                    "No valid bridge between remaining components"
                );
                break;
            };

            self.graph.add_edge(a, b, d);
            debug!(
                from = %self.graph[a].id,
                to = %self.graph[b].id,
                distance = d,
                "Bridged components"
            );
            report.bridges.push(GraphEdge {
                from: self.graph[a].id.clone(),
                to: self.graph[b].id.clone(),
                distance: d,
            });

            let merged = components.remove(cj);
            components[ci].extend(merged);
        }

        report.components = components.len();
        report
    }

    /// Single-source shortest distances from `from` to every reachable node.
    pub fn distances_from(&self, from: &str) -> IndexMap<String, f64> {
        let Some(&start) = self.index.get(from) else {
            return IndexMap::new();
        };
        let costs = dijkstra(&self.graph, start, None, |e| *e.weight());

        self.index
            .iter()
            .filter_map(|(id, idx)| costs.get(idx).map(|&c| (id.clone(), c)))
            .collect()
    }

    /// Weighted shortest path between two nodes.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Leg> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;
        let (cost, path) = astar(&self.graph, start, |n| n == goal, |e| *e.weight(), |_| 0.0)?;

        Some(Leg {
            nodes: path.into_iter().map(|idx| self.graph[idx].id.clone()).collect(),
            distance: cost,
        })
    }

    pub fn stats(&self) -> GraphStats {
        let nodes = self.node_count();
        let edges = self.edge_count();
        let components = self.component_count();

        let mut racks = Vec::new();
        let mut paired = Vec::new();
        for node in self.nodes() {
            if let Some(rack) = node.rack.rack {
                if !racks.contains(&rack) {
                    racks.push(rack);
                }
                if node.rack.partner.is_some() && !paired.contains(&rack) {
                    paired.push(rack);
                }
            }
        }

        GraphStats {
            nodes,
            edges,
            components,
            is_connected: components <= 1,
            avg_degree: if nodes > 0 { 2.0 * edges as f64 / nodes as f64 } else { 0.0 },
            racks: racks.len(),
            rack_pairs: paired.len() / 2,
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().collect(),
        }
    }
}

impl From<GraphSnapshot> for RoutingGraph {
    fn from(snapshot: GraphSnapshot) -> Self {
        let mut graph = RoutingGraph::new();
        for node in snapshot.nodes {
            graph.add_node(node);
        }
        for edge in snapshot.edges {
            graph.add_edge(&edge.from, &edge.to, edge.distance);
        }
        graph
    }
}

impl PathProvider for RoutingGraph {
    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn matrix_for(&self, waypoints: &[&str]) -> Vec<Vec<Option<f64>>> {
        let targets: Vec<Option<NodeIndex>> =
            waypoints.iter().map(|id| self.index_of(id)).collect();

        targets
            .par_iter()
            .map(|source| {
                let Some(source) = *source else {
                    return vec![None; targets.len()];
                };
                let costs = dijkstra(&self.graph, source, None, |e| *e.weight());
                targets
                    .iter()
                    .map(|target| target.and_then(|t| costs.get(&t).copied()))
                    .collect()
            })
            .collect()
    }

    fn path_between(&self, from: &str, to: &str) -> Option<Leg> {
        self.shortest_path(from, to)
    }
}
