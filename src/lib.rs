//! pick-planner core
//!
//! Warehouse routing graphs and fixed start/end pick-route optimization.

pub mod error;
pub mod geometry;
pub mod layout;
pub mod traits;
pub mod inference;
pub mod graph;
pub mod builder;
pub mod visibility;
pub mod straight_line;
pub mod solver;
pub mod config;
pub mod planner;
pub mod multi_floor;
