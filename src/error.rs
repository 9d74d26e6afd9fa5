//! Error types for the pick planner.

use thiserror::Error;

/// Malformed layout input. Surfaced immediately, never repaired.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The layout has no records at all.
    #[error("layout contains no locations")]
    EmptyLayout,

    /// A coordinate is NaN or infinite.
    #[error("location {id} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Offending record id.
        id: String,
    },

    /// Two records share one id.
    #[error("duplicate location id: {0}")]
    DuplicateId(String),

    /// A footprint with a negative or non-finite side.
    #[error("location {id} has an invalid footprint")]
    InvalidFootprint {
        /// Offending record id.
        id: String,
    },
}

/// Expected optimization outcomes that yield no route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Start or end id is not a node of the graph.
    #[error("endpoint not in graph: {0}")]
    UnknownEndpoint(String),

    /// No start was given and the layout has no staging area or walkable
    /// record to start from.
    #[error("no start location given and none found in layout")]
    NoStartLocation,

    /// Nothing left to visit after filtering.
    #[error("no reachable picks to optimize")]
    NoPicks,

    /// Two consecutive waypoints have no connecting path.
    #[error("no path from {from} to {to}")]
    Unreachable {
        /// Leg origin.
        from: String,
        /// Leg destination.
        to: String,
    },

    /// Exhaustive search requested above its cap.
    #[error("exhaustive search over {count} picks exceeds limit of {limit}")]
    TooManyPicks {
        /// Picks requested.
        count: usize,
        /// Configured cap.
        limit: usize,
    },

    /// A floor has picks but no staging or dock node to enter from.
    #[error("floor {floor} has no staging or dock access point")]
    NoAccessPoint {
        /// One-based floor number.
        floor: usize,
    },

    /// The unified multi-floor graph was requested before it was built.
    #[error("unified graph has not been built")]
    GraphNotBuilt,
}

/// Any failure of the end-to-end planning pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Layout could not be turned into a graph.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Graph was built but no route exists.
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl RouteError {
    /// Creates an unreachable-leg error.
    #[must_use]
    pub fn unreachable(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Unreachable {
            from: from.into(),
            to: to.into(),
        }
    }
}
