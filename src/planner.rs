//! One-call pipeline from a loaded layout to a solved route.

use tracing::info;

use crate::builder::build_aisle_graph;
use crate::config::PlannerConfig;
use crate::error::{LayoutError, PlanError, RouteError};
use crate::graph::{GraphStats, RoutingGraph};
use crate::inference::annotate;
use crate::layout::{Layout, LocationKind};
use crate::solver::{Route, solve};
use crate::visibility::build_visibility_graph;

/// A route together with the graph it was solved on.
#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub graph: RoutingGraph,
    pub stats: GraphStats,
    pub start: String,
    pub end: String,
    pub route: Route,
}

/// Validate a layout and build its routing graph with the matching builder.
pub fn build_graph(layout: &Layout, config: &PlannerConfig) -> Result<RoutingGraph, LayoutError> {
    layout.validate()?;

    match layout {
        Layout::Clustered(locations) => {
            let annotated = annotate(locations, &config.inference);
            Ok(build_aisle_graph(&annotated, &config.builder))
        }
        Layout::Physical(structures) => build_visibility_graph(structures, &config.visibility),
    }
}

/// Where a route starts when the caller names no start: the first staging
/// area, else the first walkable record.
pub fn default_start(layout: &Layout) -> Option<&str> {
    match layout {
        Layout::Clustered(locations) => locations
            .iter()
            .find(|l| l.traversable && l.kind == LocationKind::Staging)
            .or_else(|| locations.iter().find(|l| l.traversable))
            .map(|l| l.id.as_str()),
        Layout::Physical(structures) => structures
            .iter()
            .find(|s| s.traversable && s.kind == LocationKind::Staging)
            .or_else(|| structures.iter().find(|s| s.traversable))
            .map(|s| s.id.as_str())
            .or_else(|| {
                structures
                    .iter()
                    .flat_map(|s| s.pick_points.iter())
                    .map(|p| p.id.as_str())
                    .next()
            }),
    }
}

/// Build the graph for `layout` and route `picks` through it.
///
/// `start` falls back to [`default_start`]; `end` falls back to `start`.
pub fn plan_route(
    layout: &Layout,
    picks: &[String],
    start: Option<&str>,
    end: Option<&str>,
    config: &PlannerConfig,
) -> Result<PlannedRoute, PlanError> {
    let graph = build_graph(layout, config)?;
    let stats = graph.stats();

    let start = start
        .or_else(|| default_start(layout))
        .ok_or(RouteError::NoStartLocation)?;
    let end = end.unwrap_or(start);

    info!(
        nodes = stats.nodes,
        edges = stats.edges,
        components = stats.components,
        start,
        end,
        "Planning route"
    );

    let route = solve(&graph, start, end, picks, &config.solve)?;

    Ok(PlannedRoute {
        start: start.to_string(),
        end: end.to_string(),
        graph,
        stats,
        route,
    })
}
