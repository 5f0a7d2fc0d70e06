//! Equations of motion and derived quantities for the two-rod pendulum.
//!
//! The system is two rigid links pivoted in series under gravity, planar
//! and frictionless. Angles are measured from the hanging rest position;
//! the second link's angle is its own bearing from the vertical, so its
//! cartesian tip position is joint-relative to the first link's tip.

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::radau::{DerivativeError, OdeSystem};

/// Angular state at one instant: angles in radians, velocities in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub theta1: f64,
    pub theta2: f64,
    pub omega1: f64,
    pub omega2: f64,
}

impl StateVector {
    pub fn new(theta1: f64, theta2: f64, omega1: f64, omega2: f64) -> Self {
        Self {
            theta1,
            theta2,
            omega1,
            omega2,
        }
    }

    pub fn to_vector(self) -> Vector4<f64> {
        Vector4::new(self.theta1, self.theta2, self.omega1, self.omega2)
    }

    pub fn from_vector(y: &Vector4<f64>) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }
}

/// Tip positions of both links in meters, pivot at the origin, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianSample {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Kinetic, potential and total mechanical energy in joules.
///
/// No dissipation is modeled, so `total` is a conserved quantity up to
/// integration error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    pub kinetic: f64,
    pub potential: f64,
    pub total: f64,
}

/// Physical constants of the pendulum, split out of [`ParameterSet`] so the
/// integrator hot loop carries only what the derivative needs.
#[derive(Debug, Clone, Copy)]
pub struct PendulumSystem {
    pub m1: f64,
    pub m2: f64,
    pub l1: f64,
    pub l2: f64,
    pub g: f64,
}

impl PendulumSystem {
    pub fn new(m1: f64, m2: f64, l1: f64, l2: f64, g: f64) -> Self {
        Self { m1, m2, l1, l2, g }
    }

    pub fn from_params(params: &ParameterSet) -> Self {
        Self::new(params.m1(), params.m2(), params.l1(), params.l2(), params.g())
    }

    /// Angular accelerations (ddtheta1, ddtheta2) for the given state.
    ///
    /// Fails when the mass-matrix denominator vanishes or any intermediate
    /// value is non-finite; the integrator aborts rather than propagating
    /// such values.
    pub fn angular_accelerations(&self, state: &StateVector) -> Result<(f64, f64), DerivativeError> {
        let Self { m1, m2, l1, l2, g } = *self;
        let StateVector {
            theta1,
            theta2,
            omega1,
            omega2,
        } = *state;

        let delta = theta1 - theta2;
        let denominator = l1 * (m1 + 4.0 * m2) - 4.0 * m2 * l1 * delta.cos().powi(2);
        if denominator.abs() < 1e-12 {
            return Err(DerivativeError::SingularDenominator);
        }

        let ddtheta1 = (-(6.0 * (m1 + 2.0 * m2) * g * theta1.sin())
            - 2.0 * m2 * l1 * omega1.powi(2) * (2.0 * theta1 - 2.0 * theta2).sin()
            + 12.0 * m2 * g * theta2.sin() * delta.cos()
            - 2.0 * m2 * l2 * omega2.powi(2) * delta.sin())
            / denominator;

        let ddtheta2 = -2.0 * (l1 / l2) * ddtheta1 * delta.cos()
            + 2.0 * (l1 / l2) * omega1.powi(2) * delta.sin()
            - 6.0 * (g / l2) * theta2.sin();

        if !ddtheta1.is_finite() || !ddtheta2.is_finite() {
            return Err(DerivativeError::NonFinite);
        }
        Ok((ddtheta1, ddtheta2))
    }

    /// Tip positions for both links. Pure derivation from the state.
    pub fn cartesian(&self, state: &StateVector) -> CartesianSample {
        let x1 = self.l1 * state.theta1.sin();
        let y1 = -self.l1 * state.theta1.cos();
        let x2 = x1 + self.l2 * state.theta2.sin();
        let y2 = y1 - self.l2 * state.theta2.cos();
        CartesianSample { x1, y1, x2, y2 }
    }

    /// Mechanical energy for the state, from the Lagrangian that generates
    /// the integrated equations of motion.
    pub fn energy(&self, state: &StateVector) -> EnergySample {
        let Self { m1, m2, l1, l2, g } = *self;
        let StateVector {
            theta1,
            theta2,
            omega1,
            omega2,
        } = *state;

        let kinetic = (m1 + 4.0 * m2) * l1 * l1 * omega1 * omega1 / 12.0
            + m2 * l2 * l2 * omega2 * omega2 / 12.0
            + m2 * l1 * l2 / 3.0 * omega1 * omega2 * (theta1 - theta2).cos();
        let potential = -(m1 + 2.0 * m2) * g * l1 * theta1.cos() - m2 * g * l2 * theta2.cos();

        EnergySample {
            kinetic,
            potential,
            total: kinetic + potential,
        }
    }
}

impl OdeSystem for PendulumSystem {
    fn derivative(&self, _t: f64, y: &Vector4<f64>) -> Result<Vector4<f64>, DerivativeError> {
        let state = StateVector::from_vector(y);
        let (ddtheta1, ddtheta2) = self.angular_accelerations(&state)?;
        Ok(Vector4::new(state.omega1, state.omega2, ddtheta1, ddtheta2))
    }
}
