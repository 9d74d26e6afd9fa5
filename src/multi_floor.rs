//! Multi-floor routing.
//!
//! Each floor keeps its own graph with ids tagged `F{n}_`. Floors are either
//! merged into one graph joined by expensive transition edges and solved
//! once, or solved one at a time from their own access point and chained.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::{LayoutError, RouteError};
use crate::graph::RoutingGraph;
use crate::layout::{Layout, LocationKind};
use crate::planner::build_graph;
use crate::solver::{Route, SolveOptions, solve};
use crate::traits::PathProvider;

/// Tag `id` with its floor number.
pub fn floor_id(floor: usize, id: &str) -> String {
    format!("F{floor}_{id}")
}

/// Split a tagged id into floor number and untagged id.
pub fn parse_floor_id(id: &str) -> Option<(usize, &str)> {
    let rest = id.strip_prefix('F')?;
    let (digits, untagged) = rest.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, untagged))
}

/// Floor of a node id. Untagged ids count as floor 1.
pub fn floor_of(id: &str) -> usize {
    parse_floor_id(id).map_or(1, |(floor, _)| floor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Stair,
    Elevator,
}

/// One landing of a stairwell or elevator shaft. Landings sharing a kind and
/// an untagged id are the same shaft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPoint {
    pub kind: TransitionKind,
    pub floor: usize,
    pub id: String,
}

/// Floor changes along a route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FloorTransitions {
    pub count: usize,
    pub transitions: Vec<(usize, usize)>,
    pub floors_visited: Vec<usize>,
}

/// Scan consecutive nodes for a change of floor tag.
pub fn analyze_transitions(nodes: &[String]) -> FloorTransitions {
    let floors: Vec<usize> = nodes.iter().map(|id| floor_of(id)).collect();

    let transitions: Vec<(usize, usize)> = floors
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| (pair[0], pair[1]))
        .collect();

    let mut floors_visited = floors;
    floors_visited.sort_unstable();
    floors_visited.dedup();

    FloorTransitions {
        count: transitions.len(),
        transitions,
        floors_visited,
    }
}

#[derive(Debug, Clone)]
pub struct Floor {
    pub number: usize,
    pub graph: RoutingGraph,
}

impl Floor {
    /// First staging or dock node, where pickers enter the floor.
    pub fn access_point(&self) -> Option<&str> {
        self.graph
            .nodes()
            .find(|node| node.kind.is_access())
            .map(|node| node.id.as_str())
    }
}

/// Route solved on one floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRoute {
    pub floor: usize,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFloorRoute {
    /// Whole walk; distance includes every inter-floor penalty.
    pub route: Route,
    /// Per-floor legs, empty for unified solves.
    pub floor_routes: Vec<FloorRoute>,
    pub transitions: FloorTransitions,
}

/// Outcome of running both strategies on the same picks.
#[derive(Debug, Clone)]
pub struct StrategyComparison {
    pub unified: Result<MultiFloorRoute, RouteError>,
    pub per_floor: Result<MultiFloorRoute, RouteError>,
}

impl StrategyComparison {
    /// The shorter of the successful results.
    pub fn best(&self) -> Option<&MultiFloorRoute> {
        match (&self.unified, &self.per_floor) {
            (Ok(u), Ok(p)) => Some(if p.route.distance < u.route.distance { p } else { u }),
            (Ok(u), Err(_)) => Some(u),
            (Err(_), Ok(p)) => Some(p),
            (Err(_), Err(_)) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MultiFloorWarehouse {
    floors: Vec<Floor>,
    inter_floor_penalty: f64,
    unified: Option<RoutingGraph>,
}

impl MultiFloorWarehouse {
    /// Tag every id with its floor (numbered from 1 in input order) and
    /// build one graph per floor.
    pub fn new(layouts: &[Layout], config: &PlannerConfig) -> Result<Self, LayoutError> {
        if layouts.is_empty() {
            return Err(LayoutError::EmptyLayout);
        }

        let floors = layouts
            .iter()
            .enumerate()
            .map(|(k, layout)| -> Result<Floor, LayoutError> {
                let number = k + 1;
                let graph = build_graph(&tag_layout(layout, number), config)?;
                debug!(
                    floor = number,
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    "Built floor graph"
                );
                Ok(Floor { number, graph })
            })
            .collect::<Result<Vec<_>, LayoutError>>()?;

        info!(floors = floors.len(), "Loaded multi-floor warehouse");

        Ok(Self {
            floors,
            inter_floor_penalty: config.inter_floor_penalty,
            unified: None,
        })
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floor(&self, number: usize) -> Option<&Floor> {
        self.floors.iter().find(|f| f.number == number)
    }

    pub fn inter_floor_penalty(&self) -> f64 {
        self.inter_floor_penalty
    }

    pub fn unified_graph(&self) -> Option<&RoutingGraph> {
        self.unified.as_ref()
    }

    /// Merge every floor graph and join floors with penalty-weighted edges.
    ///
    /// With transition points, consecutive landings of each shaft are
    /// linked. Without them, every pair of floors is linked through their
    /// access points.
    pub fn build_unified(&mut self, transitions: &[TransitionPoint]) -> &RoutingGraph {
        let mut graph = RoutingGraph::new();
        for floor in &self.floors {
            graph.absorb(&floor.graph);
        }

        let mut links = 0;
        if transitions.is_empty() {
            for (i, lower) in self.floors.iter().enumerate() {
                for upper in &self.floors[i + 1..] {
                    let (Some(a), Some(b)) = (lower.access_point(), upper.access_point()) else {
                        warn!(
                            from = lower.number,
                            to = upper.number,
                            "No access point to link floors"
                        );
                        continue;
                    };
                    if graph.add_edge(a, b, self.inter_floor_penalty) {
                        links += 1;
                    }
                }
            }
        } else {
            let mut shafts: IndexMap<(TransitionKind, &str), Vec<usize>> = IndexMap::new();
            for point in transitions {
                shafts.entry((point.kind, point.id.as_str())).or_default().push(point.floor);
            }

            for ((_, id), floors) in shafts.iter_mut() {
                floors.sort_unstable();
                floors.dedup();
                for pair in floors.windows(2) {
                    let (a, b) = (floor_id(pair[0], id), floor_id(pair[1], id));
                    if !graph.contains(&a) || !graph.contains(&b) {
                        warn!(from = %a, to = %b, "Transition landing not in graph");
                        continue;
                    }
                    if graph.add_edge(&a, &b, self.inter_floor_penalty) {
                        links += 1;
                    }
                }
            }
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            links,
            "Built unified graph"
        );

        self.unified.insert(graph)
    }

    /// Map a pick to its tagged id. Untagged picks resolve to the first
    /// floor that has them.
    pub fn resolve(&self, pick: &str) -> Option<String> {
        if let Some((floor, _)) = parse_floor_id(pick) {
            if self.floor(floor).is_some_and(|f| f.graph.contains(pick)) {
                return Some(pick.to_string());
            }
        }
        self.floors
            .iter()
            .map(|f| floor_id(f.number, pick))
            .find(|tagged| self.floor(floor_of(tagged)).is_some_and(|f| f.graph.contains(tagged)))
    }

    fn resolve_all(&self, picks: &[String]) -> Vec<String> {
        picks
            .iter()
            .map(|pick| self.resolve(pick).unwrap_or_else(|| pick.clone()))
            .collect()
    }

    /// First access point of the lowest floor that has one.
    pub fn default_start(&self) -> Option<&str> {
        self.floors.iter().find_map(Floor::access_point)
    }

    /// Solve all picks in one pass over the unified graph.
    pub fn solve_unified(
        &self,
        picks: &[String],
        start: Option<&str>,
        end: Option<&str>,
        options: &SolveOptions,
    ) -> Result<MultiFloorRoute, RouteError> {
        let graph = self.unified.as_ref().ok_or(RouteError::GraphNotBuilt)?;

        let start = match start {
            Some(id) => self.resolve(id).unwrap_or_else(|| id.to_string()),
            None => self
                .default_start()
                .map(str::to_string)
                .ok_or(RouteError::NoAccessPoint { floor: 1 })?,
        };
        let end = match end {
            Some(id) => self.resolve(id).unwrap_or_else(|| id.to_string()),
            None => start.clone(),
        };

        let route = solve(graph, &start, &end, &self.resolve_all(picks), options)?;
        let transitions = analyze_transitions(&route.nodes);

        info!(
            distance = route.distance,
            transitions = transitions.count,
            "Solved unified multi-floor route"
        );

        Ok(MultiFloorRoute {
            route,
            floor_routes: Vec::new(),
            transitions,
        })
    }

    /// Solve each floor from and back to its access point, then chain the
    /// floors in order, charging the penalty once per floor change.
    pub fn solve_per_floor(
        &self,
        picks: &[String],
        options: &SolveOptions,
    ) -> Result<MultiFloorRoute, RouteError> {
        let mut by_floor: IndexMap<usize, Vec<String>> = IndexMap::new();
        for pick in picks {
            let Some(tagged) = self.resolve(pick) else {
                warn!(pick = %pick, "Pick not found on any floor, skipping");
                continue;
            };
            by_floor.entry(floor_of(&tagged)).or_default().push(tagged);
        }
        by_floor.sort_keys();

        if by_floor.is_empty() {
            return Err(RouteError::NoPicks);
        }

        let jobs: Vec<(&Floor, Vec<String>)> = by_floor
            .into_iter()
            .filter_map(|(number, picks)| self.floor(number).map(|floor| (floor, picks)))
            .collect();

        let floor_routes = jobs
            .par_iter()
            .map(|(floor, picks)| -> Result<FloorRoute, RouteError> {
                let access = floor
                    .access_point()
                    .ok_or(RouteError::NoAccessPoint { floor: floor.number })?;
                let route = solve(&floor.graph, access, access, picks, options)?;
                debug!(floor = floor.number, distance = route.distance, "Solved floor");
                Ok(FloorRoute {
                    floor: floor.number,
                    route,
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        let mut nodes = Vec::new();
        let mut ordered_picks = Vec::new();
        let mut walked = 0.0;
        for floor_route in &floor_routes {
            nodes.extend(floor_route.route.nodes.iter().cloned());
            ordered_picks.extend(floor_route.route.picks.iter().cloned());
            walked += floor_route.route.distance;
        }

        let transitions = analyze_transitions(&nodes);
        let distance = walked + self.inter_floor_penalty * transitions.count as f64;

        info!(
            floors = floor_routes.len(),
            distance,
            transitions = transitions.count,
            "Solved per-floor multi-floor route"
        );

        Ok(MultiFloorRoute {
            route: Route {
                nodes,
                picks: ordered_picks,
                distance,
                strategy: options.strategy,
            },
            floor_routes,
            transitions,
        })
    }

    /// Run both strategies on the same picks.
    pub fn compare_strategies(
        &self,
        picks: &[String],
        options: &SolveOptions,
    ) -> StrategyComparison {
        StrategyComparison {
            unified: self.solve_unified(picks, None, None, options),
            per_floor: self.solve_per_floor(picks, options),
        }
    }
}

fn tag_layout(layout: &Layout, floor: usize) -> Layout {
    match layout {
        Layout::Clustered(locations) => Layout::Clustered(
            locations
                .iter()
                .map(|l| {
                    let mut tagged = l.clone();
                    tagged.id = floor_id(floor, &l.id);
                    tagged
                })
                .collect(),
        ),
        Layout::Physical(structures) => Layout::Physical(
            structures
                .iter()
                .map(|s| {
                    let mut tagged = s.clone();
                    tagged.id = floor_id(floor, &s.id);
                    for pick in &mut tagged.pick_points {
                        pick.id = floor_id(floor, &pick.id);
                    }
                    tagged
                })
                .collect(),
        ),
    }
}

fn transition_kind(kind: LocationKind) -> Option<TransitionKind> {
    match kind {
        LocationKind::Stair => Some(TransitionKind::Stair),
        LocationKind::Elevator => Some(TransitionKind::Elevator),
        _ => None,
    }
}

/// Landings for every walkable stair and elevator on each floor, from
/// location records and physical structures alike.
pub fn transition_points(layouts: &[Layout]) -> Vec<TransitionPoint> {
    let mut points = Vec::new();
    for (k, layout) in layouts.iter().enumerate() {
        let landings: Vec<(LocationKind, &str)> = match layout {
            Layout::Clustered(locations) => locations
                .iter()
                .filter(|l| l.traversable)
                .map(|l| (l.kind, l.id.as_str()))
                .collect(),
            Layout::Physical(structures) => structures
                .iter()
                .filter(|s| s.traversable)
                .map(|s| (s.kind, s.id.as_str()))
                .collect(),
        };

        for (kind, id) in landings {
            if let Some(kind) = transition_kind(kind) {
                points.push(TransitionPoint {
                    kind,
                    floor: k + 1,
                    id: id.to_string(),
                });
            }
        }
    }
    points
}
