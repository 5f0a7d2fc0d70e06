//! Angle-versus-time series in a form both data sources can produce.
//!
//! Tracked video and integrated trajectories arrive with different shapes;
//! everything downstream works on plain [`AngleSeries`] in degrees.

use shared::MarkerObservation;
use simulator::Trajectory;

/// One arm's angle history: sample times in seconds, angles in degrees.
///
/// `t` is non-decreasing and the two vectors always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSeries {
    pub t: Vec<f64>,
    pub angles: Vec<f64>,
}

impl AngleSeries {
    pub fn new(t: Vec<f64>, angles: Vec<f64>) -> Self {
        debug_assert_eq!(t.len(), angles.len());
        Self { t, angles }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Duration from the first to the last sample, 0 when empty.
    pub fn span(&self) -> f64 {
        match (self.t.first(), self.t.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Build from tracked marker observations (angles arrive in radians).
    pub fn from_observations(observations: &[MarkerObservation]) -> Self {
        Self {
            t: observations.iter().map(|o| o.time).collect(),
            angles: observations.iter().map(|o| o.angle.to_degrees()).collect(),
        }
    }

    /// Index of the sample whose time is nearest to `time`.
    pub fn nearest_index(&self, time: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, &t) in self.t.iter().enumerate() {
            let distance = (t - time).abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}

/// Per-arm angle series of a simulated trajectory.
///
/// Angles are recovered from the Cartesian bob positions the same way the
/// tracker recovers them from pixels: a downward-zero bearing, the second
/// arm measured relative to the first joint. For the pendulum geometry this
/// reproduces `theta1` and `theta2` wrapped to (-180, 180] degrees.
pub fn trajectory_angle_series(trajectory: &Trajectory) -> (AngleSeries, AngleSeries) {
    let [l1, l2] = trajectory.lengths();

    let n = trajectory.len();
    let mut arm1 = AngleSeries::new(Vec::with_capacity(n), Vec::with_capacity(n));
    let mut arm2 = AngleSeries::new(Vec::with_capacity(n), Vec::with_capacity(n));
    for (&t, state) in trajectory.t().iter().zip(trajectory.states()) {
        let x1 = l1 * state.theta1.sin();
        let y1 = -l1 * state.theta1.cos();
        let x2 = x1 + l2 * state.theta2.sin();
        let y2 = y1 - l2 * state.theta2.cos();
        let angle1 = x1.atan2(-y1);
        let angle2 = (x2 - x1).atan2(-(y2 - y1));
        arm1.t.push(t);
        arm1.angles.push(angle1.to_degrees());
        arm2.t.push(t);
        arm2.angles.push(angle2.to_degrees());
    }
    (arm1, arm2)
}
