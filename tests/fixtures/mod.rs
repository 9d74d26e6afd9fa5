//! Test fixtures for pick-planner.
//!
//! Provides warehouse layouts shared by the integration tests:
//! - Small clustered and physical layouts mirroring real record files
//! - Hand-built scenario layouts (rack pairs, obstacles, split clusters)
//! - Seeded random layouts for property checks

#![allow(dead_code)]

pub mod warehouses;

pub use warehouses::*;
