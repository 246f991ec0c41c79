//! Builders to construct a simulation from configuration.

pub mod simulation_builder;

pub use simulation_builder::{build_pool, build_simulation, build_simulation_from_json};
