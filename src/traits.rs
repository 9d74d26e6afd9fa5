//! Core seam between path sources and the route optimizer.
//!
//! The optimizer never looks at geometry directly. Anything that can answer
//! "how far from here to there, and by which nodes" can be routed over.

use serde::{Deserialize, Serialize};

/// One shortest-path leg between two waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Node ids from origin to destination, both included.
    pub nodes: Vec<String>,
    pub distance: f64,
}

/// Provides shortest-path distances and expansions between named nodes.
pub trait PathProvider {
    /// Whether `id` can be routed to at all.
    fn contains(&self, id: &str) -> bool;

    /// Pairwise shortest-path distances, indexed by the given waypoint
    /// order. `None` marks a pair with no connecting path.
    fn matrix_for(&self, waypoints: &[&str]) -> Vec<Vec<Option<f64>>>;

    /// Node-by-node shortest path between two nodes.
    fn path_between(&self, from: &str, to: &str) -> Option<Leg>;
}
