//! Planner configuration.
//!
//! Every knob has a default tuned for typical warehouse layouts measured in
//! feet, so a config file only needs the fields it changes.

use serde::{Deserialize, Serialize};

use crate::builder::BuilderConfig;
use crate::inference::InferenceConfig;
use crate::solver::{SolveOptions, Strategy};
use crate::visibility::VisibilityConfig;

/// Default weight of an edge between floors.
pub const DEFAULT_INTER_FLOOR_PENALTY: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub inference: InferenceConfig,
    pub builder: BuilderConfig,
    pub visibility: VisibilityConfig,
    pub solve: SolveOptions,
    /// Cost charged for every move between floors.
    pub inter_floor_penalty: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            builder: BuilderConfig::default(),
            visibility: VisibilityConfig::default(),
            solve: SolveOptions::default(),
            inter_floor_penalty: DEFAULT_INTER_FLOOR_PENALTY,
        }
    }
}

impl PlannerConfig {
    /// Use one connection distance for intra-aisle and cross-aisle edges.
    pub fn with_max_connection_dist(mut self, dist: f64) -> Self {
        self.builder.max_intra_aisle_dist = dist;
        self.builder.max_cross_aisle_dist = dist;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.solve.strategy = strategy;
        self
    }

    pub fn with_inter_floor_penalty(mut self, penalty: f64) -> Self {
        self.inter_floor_penalty = penalty;
        self
    }
}
