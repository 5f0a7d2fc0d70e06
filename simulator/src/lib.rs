//! Physics engine for the chaotic double pendulum.
//!
//! Integrates the planar two-rod equations of motion with an implicit
//! Radau IIA solver at tight tolerances, derives cartesian and energy
//! samples from the angular state, and caches finished trajectories by
//! parameter fingerprint.

pub mod dynamics;
pub mod params;
pub mod radau;
pub mod trajectory;

pub use dynamics::{CartesianSample, EnergySample, PendulumSystem, StateVector};
pub use params::{ConfigError, ParameterSet, RawParameterSet};
pub use trajectory::{integrate, load_or_integrate, SimulationError, Trajectory};
