//! Motion onset detection.
//!
//! A tracked recording starts with the release hand still in frame, so the
//! first seconds of a series are flat. The onset index is where the arm
//! demonstrably starts swinging; everything before it is trimmed off ahead
//! of the regression.

/// Samples averaged per window when smoothing the frame-to-frame differences.
pub const ONSET_WINDOW: usize = 5;

/// Mean per-sample change (degrees) a window must exceed to count as motion.
pub const ONSET_THRESHOLD_DEG: f64 = 1.0;

/// Index of the first sample considered in motion.
///
/// Takes the moving average (width `window`) of the absolute differences of
/// consecutive angles and finds the first window whose mean exceeds
/// `threshold`; the onset is that window's start plus the window width,
/// clamped to the last sample. Series too short to form a window, or ones
/// that never exceed the threshold, report 0 so the caller keeps everything.
pub fn find_motion_start(angles: &[f64], window: usize, threshold: f64) -> usize {
    if angles.len() < 2 || window == 0 {
        return 0;
    }
    let diffs: Vec<f64> = angles.windows(2).map(|pair| (pair[1] - pair[0]).abs()).collect();
    if diffs.len() < window {
        return 0;
    }
    for start in 0..=diffs.len() - window {
        let mean: f64 = diffs[start..start + window].iter().sum::<f64>() / window as f64;
        if mean > threshold {
            return (start + window).min(angles.len() - 1);
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_series_has_no_onset() {
        let angles = vec![12.0; 50];
        assert_eq!(find_motion_start(&angles, ONSET_WINDOW, ONSET_THRESHOLD_DEG), 0);
    }

    #[test]
    fn test_short_series_reports_zero() {
        assert_eq!(find_motion_start(&[], ONSET_WINDOW, ONSET_THRESHOLD_DEG), 0);
        assert_eq!(find_motion_start(&[3.0], ONSET_WINDOW, ONSET_THRESHOLD_DEG), 0);
        assert_eq!(
            find_motion_start(&[0.0, 50.0, 100.0], ONSET_WINDOW, ONSET_THRESHOLD_DEG),
            0
        );
    }

    #[test]
    fn test_flat_then_ramp() {
        // 20 motionless samples, then 5 deg/sample motion. The first window
        // of differences above threshold starts at the ramp, and the onset
        // lands one window later.
        let mut angles = vec![0.0; 20];
        for i in 1..=30 {
            angles.push(5.0 * i as f64);
        }
        let onset = find_motion_start(&angles, ONSET_WINDOW, ONSET_THRESHOLD_DEG);
        assert!(
            (20..=20 + ONSET_WINDOW).contains(&onset),
            "onset {onset} outside expected range"
        );
    }

    #[test]
    fn test_onset_in_final_window_lands_on_last_sample() {
        // Motion only in the very last difference pushes the onset to the
        // last sample, never past it.
        let mut angles = vec![0.0; 6];
        angles.push(30.0);
        let onset = find_motion_start(&angles, ONSET_WINDOW, ONSET_THRESHOLD_DEG);
        assert_eq!(onset, angles.len() - 1);
    }

    #[test]
    fn test_noise_below_threshold_ignored() {
        let angles: Vec<f64> = (0..40).map(|i| 0.4 * (i % 2) as f64).collect();
        assert_eq!(find_motion_start(&angles, ONSET_WINDOW, ONSET_THRESHOLD_DEG), 0);
    }
}
