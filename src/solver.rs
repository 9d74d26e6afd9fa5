//! Pick-route solver with a fixed start and end.
//!
//! Picks are ordered by one of several interchangeable strategies, all over
//! the same shortest-path distance matrix, and the winning order is then
//! expanded into a node-by-node walk.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RouteError;
use crate::geometry::Point;
use crate::graph::RoutingGraph;
use crate::traits::PathProvider;

/// Distances closer than this are considered tied.
const TIE_EPSILON: f64 = 1e-9;

/// How the visiting order is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Nearest unvisited pick first.
    Greedy,
    /// Greedy seed improved by segment reversal.
    #[default]
    TwoOpt,
    /// Every permutation. Exact, but only for small pick lists.
    Exhaustive,
    /// Exhaustive for small pick lists, two-opt otherwise.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    pub strategy: Strategy,
    /// Maximum improvement passes for two-opt.
    pub local_search_iterations: usize,
    /// Exhaustive search refuses more picks than this.
    pub exhaustive_limit: usize,
    /// Auto switches to exhaustive search at or below this many picks, never
    /// above `exhaustive_limit`.
    pub auto_exhaustive_max: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::TwoOpt,
            local_search_iterations: 100,
            exhaustive_limit: 10,
            auto_exhaustive_max: 7,
        }
    }
}

impl SolveOptions {
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

/// A solved route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Every node walked, from start to end.
    pub nodes: Vec<String>,
    /// Picks in visiting order.
    pub picks: Vec<String>,
    /// Sum of traversed edge weights.
    pub distance: f64,
    /// Strategy that actually ran.
    pub strategy: Strategy,
}

impl Route {
    /// Node positions along the walk, for renderers.
    pub fn coordinates(&self, graph: &RoutingGraph) -> Vec<Point> {
        self.nodes.iter().filter_map(|id| graph.position(id)).collect()
    }
}

/// Distances between waypoints. Row and column 0 is the start, the last is
/// the end, picks sit in between.
struct WaypointMatrix {
    ids: Vec<String>,
    dist: Vec<Vec<Option<f64>>>,
}

impl WaypointMatrix {
    fn pick_count(&self) -> usize {
        self.ids.len() - 2
    }

    fn start(&self) -> usize {
        0
    }

    fn end(&self) -> usize {
        self.ids.len() - 1
    }

    /// Total distance of start -> order... -> end, or the first broken leg.
    fn tour_cost(&self, order: &[usize]) -> Result<f64, (usize, usize)> {
        let mut total = 0.0;
        let mut current = self.start();
        for &next in order.iter().chain(std::iter::once(&self.end())) {
            match self.dist[current][next] {
                Some(d) => total += d,
                None => return Err((current, next)),
            }
            current = next;
        }
        Ok(total)
    }

    fn unreachable(&self, (from, to): (usize, usize)) -> RouteError {
        RouteError::unreachable(&self.ids[from], &self.ids[to])
    }
}

/// Order `picks` between `start` and `end` and expand the walk.
///
/// Duplicate picks collapse to their first occurrence. Picks the provider
/// does not know are dropped with a warning.
pub fn solve<P>(
    provider: &P,
    start: &str,
    end: &str,
    picks: &[String],
    options: &SolveOptions,
) -> Result<Route, RouteError>
where
    P: PathProvider + ?Sized,
{
    for endpoint in [start, end] {
        if !provider.contains(endpoint) {
            return Err(RouteError::UnknownEndpoint(endpoint.to_string()));
        }
    }

    let mut seen = HashSet::new();
    let mut valid: Vec<&str> = Vec::new();
    for pick in picks {
        if !seen.insert(pick.as_str()) {
            continue;
        }
        if provider.contains(pick) {
            valid.push(pick);
        } else {
            warn!(pick = %pick, "Pick not in graph, skipping");
        }
    }

    if valid.is_empty() {
        return Err(RouteError::NoPicks);
    }

    let auto_exhaustive_max = options.auto_exhaustive_max.min(options.exhaustive_limit);
    let strategy = match options.strategy {
        Strategy::Auto if valid.len() <= auto_exhaustive_max => Strategy::Exhaustive,
        Strategy::Auto => Strategy::TwoOpt,
        other => other,
    };

    let mut waypoints: Vec<&str> = Vec::with_capacity(valid.len() + 2);
    waypoints.push(start);
    waypoints.extend(&valid);
    waypoints.push(end);

    let matrix = WaypointMatrix {
        ids: waypoints.iter().map(|id| id.to_string()).collect(),
        dist: provider.matrix_for(&waypoints),
    };

    let order = match strategy {
        Strategy::Greedy => greedy_order(&matrix)?,
        Strategy::Exhaustive => exhaustive_order(&matrix, options.exhaustive_limit)?,
        Strategy::TwoOpt | Strategy::Auto => {
            let seed = greedy_order(&matrix)?;
            two_opt(&matrix, seed, options.local_search_iterations)
        }
    };

    let estimated = matrix.tour_cost(&order).map_err(|leg| matrix.unreachable(leg))?;
    let route = expand(provider, &matrix, &order, strategy)?;

    info!(
        picks = route.picks.len(),
        nodes = route.nodes.len(),
        distance = route.distance,
        ?strategy,
        "Solved pick route"
    );
    debug!(matrix_distance = estimated, "Matrix estimate for chosen order");

    Ok(route)
}

/// Nearest unvisited pick first, ties to the smaller id.
fn greedy_order(matrix: &WaypointMatrix) -> Result<Vec<usize>, RouteError> {
    let mut remaining: Vec<usize> = (1..=matrix.pick_count()).collect();
    let mut order = Vec::with_capacity(remaining.len());
    let mut current = matrix.start();

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (slot, &candidate) in remaining.iter().enumerate() {
            let Some(d) = matrix.dist[current][candidate] else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_slot, best_d)) => {
                    d < best_d - TIE_EPSILON
                        || ((d - best_d).abs() <= TIE_EPSILON
                            && matrix.ids[candidate] < matrix.ids[remaining[best_slot]])
                }
            };
            if better {
                best = Some((slot, d));
            }
        }

        let Some((slot, _)) = best else {
            return Err(matrix.unreachable((current, remaining[0])));
        };
        current = remaining.remove(slot);
        order.push(current);
    }

    if matrix.dist[current][matrix.end()].is_none() {
        return Err(matrix.unreachable((current, matrix.end())));
    }

    Ok(order)
}

/// 2-opt: reverse any segment [i..=j] of the pick order when that shortens
/// the tour. First improvement wins and the scan restarts.
fn two_opt(matrix: &WaypointMatrix, mut order: Vec<usize>, max_passes: usize) -> Vec<usize> {
    let Ok(mut best_cost) = matrix.tour_cost(&order) else {
        return order;
    };
    let n = order.len();
    if n < 2 {
        return order;
    }

    let mut passes = 0;
    'search: while passes < max_passes {
        passes += 1;
        for i in 0..n - 1 {
            for j in i + 1..n {
                order[i..=j].reverse();
                if let Ok(cost) = matrix.tour_cost(&order) {
                    if cost < best_cost - TIE_EPSILON {
                        best_cost = cost;
                        continue 'search;
                    }
                }
                order[i..=j].reverse();
            }
        }
        break;
    }

    debug!(passes, cost = best_cost, "Two-opt finished");
    order
}

/// Minimum over every permutation. Branches for each first pick run in
/// parallel; ties go to the lexicographically smaller id sequence.
fn exhaustive_order(matrix: &WaypointMatrix, limit: usize) -> Result<Vec<usize>, RouteError> {
    let count = matrix.pick_count();
    if count > limit {
        return Err(RouteError::TooManyPicks { count, limit });
    }

    let picks: Vec<usize> = (1..=count).collect();
    let best = picks
        .par_iter()
        .filter_map(|&first| {
            let mut rest: Vec<usize> = picks.iter().copied().filter(|&p| p != first).collect();
            let mut best: Option<(f64, Vec<usize>)> = None;
            let mut prefix = vec![first];
            permute(matrix, &mut prefix, &mut rest, &mut best);
            best
        })
        .reduce_with(|a, b| if better_tour(matrix, &b, &a) { b } else { a });

    match best {
        Some((_, order)) => Ok(order),
        None => Err(first_broken_leg(matrix)),
    }
}

fn permute(
    matrix: &WaypointMatrix,
    prefix: &mut Vec<usize>,
    rest: &mut Vec<usize>,
    best: &mut Option<(f64, Vec<usize>)>,
) {
    if rest.is_empty() {
        if let Ok(cost) = matrix.tour_cost(prefix) {
            let candidate = (cost, prefix.clone());
            if best.as_ref().is_none_or(|current| better_tour(matrix, &candidate, current)) {
                *best = Some(candidate);
            }
        }
        return;
    }

    for k in 0..rest.len() {
        let next = rest.remove(k);
        prefix.push(next);
        permute(matrix, prefix, rest, best);
        prefix.pop();
        rest.insert(k, next);
    }
}

fn better_tour(matrix: &WaypointMatrix, a: &(f64, Vec<usize>), b: &(f64, Vec<usize>)) -> bool {
    if a.0 < b.0 - TIE_EPSILON {
        return true;
    }
    if a.0 > b.0 + TIE_EPSILON {
        return false;
    }
    let ids = |order: &[usize]| order.iter().map(|&k| matrix.ids[k].as_str()).collect::<Vec<_>>();
    ids(&a.1) < ids(&b.1)
}

/// Explain why no permutation was feasible.
fn first_broken_leg(matrix: &WaypointMatrix) -> RouteError {
    for pick in 1..=matrix.pick_count() {
        if matrix.dist[matrix.start()][pick].is_none() {
            return matrix.unreachable((matrix.start(), pick));
        }
        if matrix.dist[pick][matrix.end()].is_none() {
            return matrix.unreachable((pick, matrix.end()));
        }
    }
    for a in 1..=matrix.pick_count() {
        for b in 1..=matrix.pick_count() {
            if a != b && matrix.dist[a][b].is_none() {
                return matrix.unreachable((a, b));
            }
        }
    }
    matrix.unreachable((matrix.start(), matrix.end()))
}

/// Concatenate shortest paths between consecutive waypoints.
fn expand<P>(
    provider: &P,
    matrix: &WaypointMatrix,
    order: &[usize],
    strategy: Strategy,
) -> Result<Route, RouteError>
where
    P: PathProvider + ?Sized,
{
    let mut nodes: Vec<String> = Vec::new();
    let mut distance = 0.0;
    let mut current = matrix.start();

    for &next in order.iter().chain(std::iter::once(&matrix.end())) {
        let leg = provider
            .path_between(&matrix.ids[current], &matrix.ids[next])
            .ok_or_else(|| matrix.unreachable((current, next)))?;

        let skip = usize::from(!nodes.is_empty());
        nodes.extend(leg.nodes.into_iter().skip(skip));
        distance += leg.distance;
        current = next;
    }

    Ok(Route {
        nodes,
        picks: order.iter().map(|&k| matrix.ids[k].clone()).collect(),
        distance,
        strategy,
    })
}
