//! Gait-Simulation: synthetic walking trials
//!
//! Deterministic GRF and joint-angle generation for tests, benchmarks and
//! demos of the phase pipeline.

pub mod gait_patterns;
pub mod trial_simulator;

pub use gait_patterns::*;
pub use trial_simulator::*;
