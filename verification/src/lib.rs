//! Verification of simulated trajectories against tracked video.
//!
//! Takes one arm's tracked marker series and the corresponding simulated
//! trajectory, trims the measured side at its motion onset, smooths both
//! with truncated Fourier regression, and reports the pointwise deviation
//! of the fits on a shared grid.

pub mod align;
pub mod fourier;
pub mod onset;
pub mod plot;
pub mod series;

pub use align::{
    align_arm, common_grid, deviation_series, AlignConfig, AlignMode, ArmAlignment,
    DeviationSeries,
};
pub use fourier::{fit_fourier, FourierFit, FourierModel, DEFAULT_NUM_TERMS};
pub use onset::{find_motion_start, ONSET_THRESHOLD_DEG, ONSET_WINDOW};
pub use series::{trajectory_angle_series, AngleSeries};
