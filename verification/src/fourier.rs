//! Truncated Fourier series regression.
//!
//! Tracked angle series are noisy and unevenly sampled relative to the
//! simulation grid, so both sides are smoothed by fitting a truncated
//! Fourier series and comparing the fits on a common grid. The fit is a
//! damped Gauss-Newton least squares iteration solved through an SVD, with
//! a hard iteration budget; a fit that stalls is returned as-is and flagged
//! rather than treated as an error.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

/// Harmonics fitted by default.
pub const DEFAULT_NUM_TERMS: usize = 10;

const MAX_ITERATIONS: usize = 50;
const MAX_STEP_HALVINGS: usize = 8;
const CONVERGENCE_TOL: f64 = 1e-10;
const SVD_EPS: f64 = 1e-10;

/// A fitted truncated Fourier series.
///
/// Coefficients are laid out `[a0, a1, b1, a2, b2, ...]` for
/// `a0 + Σ aₙ cos(2nπt/T) + bₙ sin(2nπt/T)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierModel {
    period: f64,
    coefficients: Vec<f64>,
}

impl FourierModel {
    /// The all-zero model, used for series too short to fit.
    pub fn zero(period: f64, num_terms: usize) -> Self {
        Self {
            period: period.max(1e-6),
            coefficients: vec![0.0; 2 * num_terms + 1],
        }
    }

    pub fn num_terms(&self) -> usize {
        self.coefficients.len() / 2
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let mut value = self.coefficients[0];
        for n in 1..=self.num_terms() {
            let phase = 2.0 * n as f64 * std::f64::consts::PI * t / self.period;
            value += self.coefficients[2 * n - 1] * phase.cos();
            value += self.coefficients[2 * n] * phase.sin();
        }
        value
    }

    pub fn evaluate_grid(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&t| self.evaluate(t)).collect()
    }
}

/// Outcome of a regression: the model plus how the iteration went.
///
/// `converged: false` means the iteration budget ran out or a step could
/// not reduce the residual; the model is still the best one seen.
#[derive(Debug, Clone)]
pub struct FourierFit {
    pub model: FourierModel,
    pub converged: bool,
    pub iterations: usize,
    pub rms_residual: f64,
}

fn rms(residual: &DVector<f64>) -> f64 {
    if residual.is_empty() {
        0.0
    } else {
        (residual.norm_squared() / residual.len() as f64).sqrt()
    }
}

/// Basis matrix: one row per sample, columns `1, cos ωt, sin ωt, cos 2ωt, ...`
fn design_matrix(t: &[f64], period: f64, num_terms: usize) -> DMatrix<f64> {
    DMatrix::from_fn(t.len(), 2 * num_terms + 1, |row, col| {
        if col == 0 {
            1.0
        } else {
            let n = (col + 1) / 2;
            let phase = 2.0 * n as f64 * std::f64::consts::PI * t[row] / period;
            if col % 2 == 1 {
                phase.cos()
            } else {
                phase.sin()
            }
        }
    })
}

/// Fit a truncated Fourier series of `num_terms` harmonics to `(t, y)`.
///
/// The period is the series' own span (last sample time), floored at 1e-6
/// to keep the basis well defined. Fewer than two samples produce the
/// all-zero model. The initial guess is the sample mean with zero
/// harmonics; each Gauss-Newton step is halved until it reduces the RMS
/// residual, up to a fixed number of halvings.
pub fn fit_fourier(t: &[f64], y: &[f64], num_terms: usize) -> FourierFit {
    debug_assert_eq!(t.len(), y.len());
    let period = t.last().copied().unwrap_or(1.0).max(1e-6);
    if t.len() < 2 {
        return FourierFit {
            model: FourierModel::zero(period, num_terms),
            converged: true,
            iterations: 0,
            rms_residual: 0.0,
        };
    }

    let observed = DVector::from_column_slice(y);
    let basis = design_matrix(t, period, num_terms);
    let svd = basis.clone().svd(true, true);

    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let mut coefficients = DVector::zeros(2 * num_terms + 1);
    coefficients[0] = mean;
    let mut residual = &observed - &basis * &coefficients;
    let mut best_rms = rms(&residual);

    for iteration in 1..=MAX_ITERATIONS {
        let full_step = match svd.solve(&residual, SVD_EPS) {
            Ok(step) => step,
            Err(message) => {
                warn!("fourier fit SVD solve failed: {message}");
                return FourierFit {
                    model: model_from(period, &coefficients),
                    converged: false,
                    iterations: iteration,
                    rms_residual: best_rms,
                };
            }
        };

        // Halve the step until the residual actually shrinks.
        let mut scale = 1.0;
        let mut improved = false;
        for _ in 0..=MAX_STEP_HALVINGS {
            let candidate = &coefficients + &full_step * scale;
            let candidate_residual = &observed - &basis * &candidate;
            let candidate_rms = rms(&candidate_residual);
            if candidate_rms <= best_rms {
                let step_size = full_step.norm() * scale;
                coefficients = candidate;
                residual = candidate_residual;
                best_rms = candidate_rms;
                improved = true;
                if step_size <= CONVERGENCE_TOL * coefficients.norm().max(1.0) {
                    debug!(
                        "fourier fit converged after {iteration} iterations, rms {best_rms:.3e}"
                    );
                    return FourierFit {
                        model: model_from(period, &coefficients),
                        converged: true,
                        iterations: iteration,
                        rms_residual: best_rms,
                    };
                }
                break;
            }
            scale *= 0.5;
        }

        if !improved {
            // Stalled: no step length reduces the residual any further.
            debug!("fourier fit stalled after {iteration} iterations, rms {best_rms:.3e}");
            return FourierFit {
                model: model_from(period, &coefficients),
                converged: true,
                iterations: iteration,
                rms_residual: best_rms,
            };
        }
    }

    warn!("fourier fit hit the iteration budget, rms residual {best_rms:.3e}");
    FourierFit {
        model: model_from(period, &coefficients),
        converged: false,
        iterations: MAX_ITERATIONS,
        rms_residual: best_rms,
    }
}

fn model_from(period: f64, coefficients: &DVector<f64>) -> FourierModel {
    FourierModel {
        period,
        coefficients: coefficients.iter().copied().collect(),
    }
}
