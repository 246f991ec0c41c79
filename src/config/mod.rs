//! Configuration models for a simulation run.

pub mod simulation;

pub use simulation::SimulationConfig;
