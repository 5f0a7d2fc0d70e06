//! Aligning a tracked series against a simulated one.
//!
//! The measured clock starts when the recording starts, not when the
//! pendulum is released, so the measured series is trimmed at its motion
//! onset and re-zeroed there. The simulated series is then restricted to
//! the measured span, both are smoothed by Fourier regression, and the
//! fits are compared pointwise on a shared grid.

use log::info;

use crate::fourier::{fit_fourier, FourierFit, DEFAULT_NUM_TERMS};
use crate::onset::{find_motion_start, ONSET_THRESHOLD_DEG, ONSET_WINDOW};
use crate::series::AngleSeries;

/// How the simulated time axis relates to the trimmed measured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Keep the simulated axis as-is and drop samples past the measured
    /// span. Assumes the simulation already starts at the release.
    TruncateToMeasured,
    /// Re-zero the simulated axis at its sample nearest the measured onset
    /// time, then truncate. Use when the simulated span covers the whole
    /// recording including the motionless lead-in.
    RezeroSimulated,
}

#[derive(Debug, Clone)]
pub struct AlignConfig {
    pub mode: AlignMode,
    pub onset_window: usize,
    pub onset_threshold: f64,
    /// Fourier harmonics per fit.
    pub num_terms: usize,
    /// Samples on the shared comparison grid.
    pub grid_points: usize,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            mode: AlignMode::TruncateToMeasured,
            onset_window: ONSET_WINDOW,
            onset_threshold: ONSET_THRESHOLD_DEG,
            num_terms: DEFAULT_NUM_TERMS,
            grid_points: 1000,
        }
    }
}

/// One arm's aligned series and their fits.
#[derive(Debug, Clone)]
pub struct ArmAlignment {
    /// Measured series trimmed at onset and re-zeroed.
    pub measured: AngleSeries,
    /// Simulated series processed per [`AlignMode`].
    pub simulated: AngleSeries,
    pub measured_fit: FourierFit,
    pub simulated_fit: FourierFit,
}

/// Pointwise fit difference (measured minus simulated, degrees) on the
/// shared grid. Derived per comparison, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationSeries {
    pub t: Vec<f64>,
    pub deviation: Vec<f64>,
}

fn rezero_at(series: &AngleSeries, index: usize) -> AngleSeries {
    let origin = series.t[index];
    AngleSeries::new(
        series.t[index..].iter().map(|&t| t - origin).collect(),
        series.angles[index..].to_vec(),
    )
}

fn truncate_after(series: &AngleSeries, max_time: f64) -> AngleSeries {
    let keep = series.t.iter().take_while(|&&t| t <= max_time).count();
    AngleSeries::new(series.t[..keep].to_vec(), series.angles[..keep].to_vec())
}

/// Align one arm's measured series against its simulated counterpart.
pub fn align_arm(
    measured: &AngleSeries,
    simulated: &AngleSeries,
    config: &AlignConfig,
) -> ArmAlignment {
    let onset = find_motion_start(&measured.angles, config.onset_window, config.onset_threshold);
    let onset_time = measured.t.get(onset).copied().unwrap_or(0.0);
    let measured = if measured.is_empty() {
        measured.clone()
    } else {
        rezero_at(measured, onset)
    };
    let max_time = measured.t.last().copied().unwrap_or(0.0);

    let simulated = match config.mode {
        AlignMode::TruncateToMeasured => truncate_after(simulated, max_time),
        AlignMode::RezeroSimulated => {
            if simulated.is_empty() {
                simulated.clone()
            } else {
                truncate_after(&rezero_at(simulated, simulated.nearest_index(onset_time)), max_time)
            }
        }
    };

    info!(
        "aligned arm: onset sample {onset} ({onset_time:.3} s), {} measured / {} simulated samples over {max_time:.3} s",
        measured.len(),
        simulated.len()
    );

    let measured_fit = fit_fourier(&measured.t, &measured.angles, config.num_terms);
    let simulated_fit = fit_fourier(&simulated.t, &simulated.angles, config.num_terms);
    ArmAlignment {
        measured,
        simulated,
        measured_fit,
        simulated_fit,
    }
}

/// The shared evaluation grid: `grid_points` even samples from zero to the
/// shortest aligned span. Any empty series forces an empty grid.
pub fn common_grid(alignments: &[ArmAlignment], grid_points: usize) -> Vec<f64> {
    let max_time = alignments
        .iter()
        .flat_map(|arm| [&arm.measured, &arm.simulated])
        .map(|series| series.t.last().copied().unwrap_or(0.0))
        .fold(f64::INFINITY, f64::min);
    if !max_time.is_finite() || max_time <= 0.0 || grid_points < 2 {
        return Vec::new();
    }
    (0..grid_points)
        .map(|i| max_time * i as f64 / (grid_points - 1) as f64)
        .collect()
}

/// Deviation of each aligned arm on one shared grid.
pub fn deviation_series(alignments: &[ArmAlignment], grid_points: usize) -> Vec<DeviationSeries> {
    let grid = common_grid(alignments, grid_points);
    alignments
        .iter()
        .map(|arm| {
            let measured = arm.measured_fit.model.evaluate_grid(&grid);
            let simulated = arm.simulated_fit.model.evaluate_grid(&grid);
            DeviationSeries {
                t: grid.clone(),
                deviation: measured
                    .iter()
                    .zip(&simulated)
                    .map(|(m, s)| m - s)
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A still lead-in followed by a decaying swing, sampled at `fps`.
    fn swing_series(lead_in: usize, motion: usize, fps: f64) -> AngleSeries {
        let mut t = Vec::new();
        let mut angles = Vec::new();
        for i in 0..lead_in + motion {
            t.push(i as f64 / fps);
            if i < lead_in {
                angles.push(90.0);
            } else {
                let phase = (i - lead_in) as f64 / fps;
                angles.push(90.0 * (3.0 * phase).cos() * (-0.1 * phase).exp());
            }
        }
        AngleSeries::new(t, angles)
    }

    #[test]
    fn test_measured_rezeroed_at_onset() {
        let measured = swing_series(30, 120, 30.0);
        let simulated = swing_series(0, 200, 30.0);
        let alignment = align_arm(&measured, &simulated, &AlignConfig::default());

        assert_relative_eq!(alignment.measured.t[0], 0.0);
        // Trimmed close to the 30-sample lead-in, allowing the onset
        // window of slack.
        let trimmed = measured.len() - alignment.measured.len();
        assert!(
            (30..=30 + ONSET_WINDOW).contains(&trimmed),
            "trimmed {trimmed} samples"
        );
    }

    #[test]
    fn test_truncate_mode_keeps_simulated_axis() {
        let measured = swing_series(30, 60, 30.0);
        let simulated = swing_series(0, 300, 30.0);
        let alignment = align_arm(&measured, &simulated, &AlignConfig::default());

        let span = alignment.measured.t.last().copied().unwrap();
        assert_relative_eq!(alignment.simulated.t[0], 0.0);
        assert!(alignment.simulated.t.last().copied().unwrap() <= span);
        // The simulated series kept its own samples, just fewer of them.
        assert_eq!(
            alignment.simulated.angles[..],
            simulated.angles[..alignment.simulated.len()]
        );
    }

    #[test]
    fn test_rezero_mode_on_identical_series_is_exact() {
        // Feeding the same recording to both sides must align it with
        // itself sample-for-sample.
        let series = swing_series(30, 120, 30.0);
        let config = AlignConfig {
            mode: AlignMode::RezeroSimulated,
            ..AlignConfig::default()
        };
        let alignment = align_arm(&series, &series, &config);

        assert_eq!(alignment.measured, alignment.simulated);

        let deviations = deviation_series(std::slice::from_ref(&alignment), 200);
        for value in &deviations[0].deviation {
            assert_relative_eq!(*value, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_common_grid_spans_shortest_series() {
        let measured = swing_series(0, 90, 30.0);
        let simulated = swing_series(0, 300, 30.0);
        let alignment = align_arm(&measured, &simulated, &AlignConfig::default());

        let grid = common_grid(std::slice::from_ref(&alignment), 1000);
        assert_eq!(grid.len(), 1000);
        assert_relative_eq!(grid[0], 0.0);
        let shortest = alignment
            .measured
            .span()
            .min(alignment.simulated.span());
        assert_relative_eq!(*grid.last().unwrap(), shortest, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_measured_yields_empty_deviation() {
        let measured = AngleSeries::new(vec![], vec![]);
        let simulated = swing_series(0, 100, 30.0);
        let alignment = align_arm(&measured, &simulated, &AlignConfig::default());

        let deviations = deviation_series(std::slice::from_ref(&alignment), 1000);
        assert!(deviations[0].t.is_empty());
        assert!(deviations[0].deviation.is_empty());
    }

    #[test]
    fn test_shared_grid_across_arms() {
        let arm1 = align_arm(
            &swing_series(0, 90, 30.0),
            &swing_series(0, 300, 30.0),
            &AlignConfig::default(),
        );
        let arm2 = align_arm(
            &swing_series(0, 150, 30.0),
            &swing_series(0, 300, 30.0),
            &AlignConfig::default(),
        );
        let deviations = deviation_series(&[arm1, arm2], 500);
        assert_eq!(deviations[0].t, deviations[1].t);
        // Bound by the shorter arm.
        assert!(*deviations[0].t.last().unwrap() <= 90.0 / 30.0);
    }
}
