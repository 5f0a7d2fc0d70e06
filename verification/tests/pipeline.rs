//! Full pipeline checks: integrate, persist, track-shaped ingestion, align.

use approx::assert_relative_eq;
use tempfile::TempDir;

use shared::{MarkerObservation, MarkerTrackRecord, PixelPoint, RecordStore};
use simulator::{load_or_integrate, ParameterSet, RawParameterSet};
use verification::{
    align_arm, deviation_series, trajectory_angle_series, AlignConfig, AlignMode, AngleSeries,
};

/// Reference physical constants over a span short enough for unit tests.
fn test_params() -> ParameterSet {
    ParameterSet::new(RawParameterSet {
        t_end: 3.0,
        num_points: 301,
        ..RawParameterSet::default()
    })
    .unwrap()
}

fn rezero_config() -> AlignConfig {
    AlignConfig {
        mode: AlignMode::RezeroSimulated,
        ..AlignConfig::default()
    }
}

#[test]
fn test_reference_configuration_integrates() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path());
    let params = test_params();

    let trajectory = load_or_integrate(&store, &params).unwrap();
    assert_eq!(trajectory.len(), params.num_points());

    let (arm1, arm2) = trajectory_angle_series(&trajectory);
    assert_eq!(arm1.len(), trajectory.len());
    assert_eq!(arm2.len(), trajectory.len());
    // Released from horizontal: the first arm starts at 90 degrees and
    // actually swings.
    assert_relative_eq!(arm1.angles[0], 90.0, epsilon = 1e-9);
    assert!(arm1.angles.iter().any(|&a| a < 45.0));
}

#[test]
fn test_full_reference_span_integrates() {
    // The complete 40-second reference run, exactly as the simulator binary
    // performs it.
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path());
    let params = ParameterSet::reference();

    let trajectory = load_or_integrate(&store, &params).unwrap();
    assert_eq!(trajectory.len(), 4000);
    assert_relative_eq!(trajectory.t()[0], params.t_start());
    assert_relative_eq!(*trajectory.t().last().unwrap(), params.t_end());
    assert!(trajectory.t().windows(2).all(|w| w[1] > w[0]));
    assert!(trajectory
        .states()
        .iter()
        .all(|s| s.to_vector().iter().all(|v| v.is_finite())));
}

#[test]
fn test_self_comparison_deviation_is_zero() {
    // A recording that matches the simulation perfectly must produce zero
    // deviation: feed the trajectory's own angle series through the
    // marker-track record format and align it against itself.
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path());
    let trajectory = load_or_integrate(&store, &test_params()).unwrap();
    let (sim_arm1, sim_arm2) = trajectory_angle_series(&trajectory);

    let observations = |series: &AngleSeries| -> Vec<MarkerObservation> {
        series
            .t
            .iter()
            .zip(&series.angles)
            .map(|(&time, &angle)| MarkerObservation {
                time,
                angle: angle.to_radians(),
                position: PixelPoint::new(0.0, 0.0),
            })
            .collect()
    };
    let record = MarkerTrackRecord {
        pivot: PixelPoint::new(320.0, 240.0),
        first: observations(&sim_arm1),
        second: observations(&sim_arm2),
    };
    store.save_marker_track("selfcheck", &record).unwrap();

    let reloaded = store.get_marker_track("selfcheck").unwrap().unwrap();
    let config = rezero_config();
    let arm1 = align_arm(
        &AngleSeries::from_observations(&reloaded.first),
        &sim_arm1,
        &config,
    );
    let arm2 = align_arm(
        &AngleSeries::from_observations(&reloaded.second),
        &sim_arm2,
        &config,
    );

    assert!(arm1.measured_fit.converged);
    assert!(arm1.simulated_fit.converged);

    let deviations = deviation_series(&[arm1, arm2], config.grid_points);
    assert_eq!(deviations.len(), 2);
    assert_eq!(deviations[0].t.len(), config.grid_points);
    for series in &deviations {
        for &value in &series.deviation {
            // The degree/radian round trip through the record format is
            // the only noise source.
            assert_relative_eq!(value, 0.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_motionless_lead_in_is_trimmed_out() {
    // Both the recording and the simulation start with the pendulum held
    // still; re-zeroed alignment drops the lead-in and the deviation stays
    // zero.
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path());
    let trajectory = load_or_integrate(&store, &test_params()).unwrap();
    let (sim_arm1, _) = trajectory_angle_series(&trajectory);

    let lead_in = 40;
    let dt = sim_arm1.t[1] - sim_arm1.t[0];
    let with_lead_in = {
        let mut t = Vec::new();
        let mut angles = Vec::new();
        for i in 0..lead_in {
            t.push(i as f64 * dt);
            angles.push(sim_arm1.angles[0]);
        }
        for (&time, &angle) in sim_arm1.t.iter().zip(&sim_arm1.angles) {
            t.push(lead_in as f64 * dt + time);
            angles.push(angle);
        }
        AngleSeries::new(t, angles)
    };

    let config = rezero_config();
    let alignment = align_arm(&with_lead_in, &with_lead_in, &config);

    // Trimmed at the onset: the whole lead-in plus the short ramp-up it
    // takes a pendulum starting from rest to exceed the motion threshold.
    let trimmed = with_lead_in.len() - alignment.measured.len();
    assert!(
        (lead_in..=lead_in + 20).contains(&trimmed),
        "trimmed {trimmed} samples, lead-in was {lead_in}"
    );
    assert_relative_eq!(alignment.measured.t[0], 0.0);

    let deviations = deviation_series(std::slice::from_ref(&alignment), config.grid_points);
    for &value in &deviations[0].deviation {
        assert_relative_eq!(value, 0.0, epsilon = 1e-9);
    }
}
