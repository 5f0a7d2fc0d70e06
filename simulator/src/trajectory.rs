//! Integration runs and the fingerprint-keyed trajectory cache.

use log::{info, warn};
use thiserror::Error;

use shared::{RecordStore, StoreError, TrajectoryRecord};

use crate::dynamics::{PendulumSystem, StateVector};
use crate::params::{ConfigError, ParameterSet};
use crate::radau::{self, SolverError};

/// Failures producing or persisting a trajectory.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("invalid parameter set: {0}")]
    Config(#[from] ConfigError),

    /// The integrator hit a singular or non-finite derivative. No valid
    /// trajectory exists past that point and nothing is cached.
    #[error("integration aborted: {0}")]
    NumericalInstability(#[from] SolverError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An integrated trajectory: `num_points` evenly spaced samples over the
/// configured time span. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    t: Vec<f64>,
    states: Vec<StateVector>,
    lengths: [f64; 2],
}

impl Trajectory {
    /// Sample times in seconds
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    /// Angular states, one per sample time
    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    /// Link lengths (l1, l2) in meters
    pub fn lengths(&self) -> [f64; 2] {
        self.lengths
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Largest relative drift of total energy from its initial value.
    ///
    /// The system is frictionless, so this measures accumulated
    /// integration error.
    pub fn max_energy_drift(&self, system: &PendulumSystem) -> f64 {
        let initial = match self.states.first() {
            Some(state) => system.energy(state).total,
            None => return 0.0,
        };
        self.states
            .iter()
            .map(|state| (system.energy(state).total - initial).abs())
            .fold(0.0, f64::max)
            / initial.abs().max(f64::MIN_POSITIVE)
    }

    /// Convert to the on-disk record form.
    pub fn to_record(&self) -> TrajectoryRecord {
        let mut y: [Vec<f64>; 4] =
            std::array::from_fn(|_| Vec::with_capacity(self.states.len()));
        for state in &self.states {
            y[0].push(state.theta1);
            y[1].push(state.theta2);
            y[2].push(state.omega1);
            y[3].push(state.omega2);
        }
        TrajectoryRecord {
            y,
            t: self.t.clone(),
            lengths: self.lengths,
        }
    }

    /// Rebuild from an on-disk record (already shape-checked at parse).
    pub fn from_record(record: &TrajectoryRecord) -> Self {
        let states = (0..record.t.len())
            .map(|i| {
                StateVector::new(
                    record.y[0][i],
                    record.y[1][i],
                    record.y[2][i],
                    record.y[3][i],
                )
            })
            .collect();
        Self {
            t: record.t.clone(),
            states,
            lengths: record.lengths,
        }
    }
}

/// The evenly spaced output grid for a parameter set. The final sample is
/// pinned to `t_end` exactly.
fn sample_grid(params: &ParameterSet) -> Vec<f64> {
    let n = params.num_points();
    let step = (params.t_end() - params.t_start()) / (n - 1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|i| params.t_start() + step * i as f64).collect();
    grid[n - 1] = params.t_end();
    grid
}

/// Integrate the equations of motion for a parameter set.
///
/// One blocking compute-bound call. Aborts with
/// [`SimulationError::NumericalInstability`] on a singular or non-finite
/// derivative; never returns a partial trajectory.
pub fn integrate(params: &ParameterSet) -> Result<Trajectory, SimulationError> {
    let system = PendulumSystem::from_params(params);
    let y0 = StateVector::new(
        params.theta1_0(),
        params.theta2_0(),
        params.omega1_0(),
        params.omega2_0(),
    )
    .to_vector();
    let t = sample_grid(params);

    info!(
        "integrating {} samples over [{}, {}] s (rtol {:.1e}, atol {:.1e})",
        params.num_points(),
        params.t_start(),
        params.t_end(),
        params.rtol(),
        params.atol()
    );
    let solution = radau::integrate(&system, y0, &t, params.rtol(), params.atol())?;
    let states = solution.iter().map(StateVector::from_vector).collect();

    Ok(Trajectory {
        t,
        states,
        lengths: [params.l1(), params.l2()],
    })
}

/// Return the cached trajectory for these parameters, integrating and
/// storing a fresh one only when no usable record exists.
///
/// A record that exists but fails to load is treated like a miss: it is
/// recomputed and overwritten. A failed integration stores nothing.
pub fn load_or_integrate(
    store: &RecordStore,
    params: &ParameterSet,
) -> Result<Trajectory, SimulationError> {
    let fingerprint = params.fingerprint();
    match store.get_trajectory(&fingerprint) {
        Some(Ok(record)) => {
            info!("trajectory cache hit for {fingerprint}");
            return Ok(Trajectory::from_record(&record));
        }
        Some(Err(e)) => {
            warn!("discarding unreadable trajectory record for {fingerprint}: {e}");
        }
        None => {
            info!("trajectory cache miss for {fingerprint}");
        }
    }

    let trajectory = integrate(params)?;
    store.save_trajectory(&fingerprint, &trajectory.to_record())?;
    Ok(trajectory)
}
