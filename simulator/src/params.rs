//! Validated simulation parameters and their cache fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Parameter validation failures. Fatal before any computation runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be strictly positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("time span must satisfy t_end > t_start, got [{t_start}, {t_end}]")]
    InvalidTimeSpan { t_start: f64, t_end: f64 },

    #[error("num_points must be at least 2, got {0}")]
    TooFewSamples(usize),
}

/// Raw, unvalidated parameter fields as they appear in a config document.
///
/// This is the serde surface; a [`ParameterSet`] is obtained through
/// validation and is immutable from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameterSet {
    /// Mass of the first link in kg
    pub m1: f64,
    /// Mass of the second link in kg
    pub m2: f64,
    /// Length of the first link in meters
    pub l1: f64,
    /// Length of the second link in meters
    pub l2: f64,
    /// Gravitational acceleration in m/s^2
    pub g: f64,
    /// Initial angle of link 1 in radians
    pub theta1_0: f64,
    /// Initial angle of link 2 in radians
    pub theta2_0: f64,
    /// Initial angular velocity of link 1 in rad/s
    pub omega1_0: f64,
    /// Initial angular velocity of link 2 in rad/s
    pub omega2_0: f64,
    /// Start of the simulated time span in seconds
    pub t_start: f64,
    /// End of the simulated time span in seconds
    pub t_end: f64,
    /// Number of evenly spaced output samples
    pub num_points: usize,
    /// Relative error tolerance for the integrator
    pub rtol: f64,
    /// Absolute error tolerance for the integrator
    pub atol: f64,
}

impl Default for RawParameterSet {
    /// The reference bench configuration: two aluminium links of 0.525 m
    /// and 0.473 m, released horizontally.
    fn default() -> Self {
        Self {
            m1: 5.0,
            m2: 4.0,
            l1: 0.525,
            l2: 0.473,
            g: 9.81,
            theta1_0: std::f64::consts::FRAC_PI_2,
            theta2_0: 0.0,
            omega1_0: 0.0,
            omega2_0: 0.0,
            t_start: 0.0,
            t_end: 40.0,
            num_points: 4000,
            rtol: 1e-9,
            atol: 1e-10,
        }
    }
}

/// Immutable, validated physical and solver configuration for one run.
///
/// Constructed once per run; rejected at construction when inconsistent.
/// The fingerprint is a stable content hash over the canonicalized fields
/// and keys the trajectory cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterSet", into = "RawParameterSet")]
pub struct ParameterSet {
    raw: RawParameterSet,
}

impl ParameterSet {
    /// Validate raw parameters into an immutable set.
    pub fn new(raw: RawParameterSet) -> Result<Self, ConfigError> {
        let positive = [
            ("m1", raw.m1),
            ("m2", raw.m2),
            ("l1", raw.l1),
            ("l2", raw.l2),
            ("g", raw.g),
            ("rtol", raw.rtol),
            ("atol", raw.atol),
        ];
        for (field, value) in positive {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let finite = [
            ("theta1_0", raw.theta1_0),
            ("theta2_0", raw.theta2_0),
            ("omega1_0", raw.omega1_0),
            ("omega2_0", raw.omega2_0),
            ("t_start", raw.t_start),
            ("t_end", raw.t_end),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        if raw.t_end <= raw.t_start {
            return Err(ConfigError::InvalidTimeSpan {
                t_start: raw.t_start,
                t_end: raw.t_end,
            });
        }
        if raw.num_points < 2 {
            return Err(ConfigError::TooFewSamples(raw.num_points));
        }

        Ok(Self { raw })
    }

    /// The reference bench configuration (see [`RawParameterSet::default`]).
    pub fn reference() -> Self {
        Self::new(RawParameterSet::default()).expect("reference parameters are valid")
    }

    pub fn m1(&self) -> f64 {
        self.raw.m1
    }
    pub fn m2(&self) -> f64 {
        self.raw.m2
    }
    pub fn l1(&self) -> f64 {
        self.raw.l1
    }
    pub fn l2(&self) -> f64 {
        self.raw.l2
    }
    pub fn g(&self) -> f64 {
        self.raw.g
    }
    pub fn theta1_0(&self) -> f64 {
        self.raw.theta1_0
    }
    pub fn theta2_0(&self) -> f64 {
        self.raw.theta2_0
    }
    pub fn omega1_0(&self) -> f64 {
        self.raw.omega1_0
    }
    pub fn omega2_0(&self) -> f64 {
        self.raw.omega2_0
    }
    pub fn t_start(&self) -> f64 {
        self.raw.t_start
    }
    pub fn t_end(&self) -> f64 {
        self.raw.t_end
    }
    pub fn num_points(&self) -> usize {
        self.raw.num_points
    }
    pub fn rtol(&self) -> f64 {
        self.raw.rtol
    }
    pub fn atol(&self) -> f64 {
        self.raw.atol
    }

    /// Deterministic content hash of the canonicalized fields, used as the
    /// trajectory cache key. Floats are hashed through their IEEE-754 bit
    /// patterns so the fingerprint is exact, not formatting-dependent.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let floats = [
            self.raw.m1,
            self.raw.m2,
            self.raw.l1,
            self.raw.l2,
            self.raw.g,
            self.raw.theta1_0,
            self.raw.theta2_0,
            self.raw.omega1_0,
            self.raw.omega2_0,
            self.raw.t_start,
            self.raw.t_end,
            self.raw.rtol,
            self.raw.atol,
        ];
        for value in floats {
            hasher.update(value.to_bits().to_le_bytes());
        }
        hasher.update((self.raw.num_points as u64).to_le_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl TryFrom<RawParameterSet> for ParameterSet {
    type Error = ConfigError;

    fn try_from(raw: RawParameterSet) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<ParameterSet> for RawParameterSet {
    fn from(params: ParameterSet) -> Self {
        params.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parameters_validate() {
        let params = ParameterSet::reference();
        assert_eq!(params.num_points(), 4000);
        assert_eq!(params.t_end(), 40.0);
    }

    #[test]
    fn test_rejects_non_positive_mass() {
        let raw = RawParameterSet {
            m1: 0.0,
            ..RawParameterSet::default()
        };
        let err = ParameterSet::new(raw).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositive {
                field: "m1",
                value: 0.0
            }
        );
    }

    #[test]
    fn test_rejects_inverted_time_span() {
        let raw = RawParameterSet {
            t_start: 10.0,
            t_end: 10.0,
            ..RawParameterSet::default()
        };
        assert!(matches!(
            ParameterSet::new(raw).unwrap_err(),
            ConfigError::InvalidTimeSpan { .. }
        ));
    }

    #[test]
    fn test_rejects_single_sample() {
        let raw = RawParameterSet {
            num_points: 1,
            ..RawParameterSet::default()
        };
        assert_eq!(
            ParameterSet::new(raw).unwrap_err(),
            ConfigError::TooFewSamples(1)
        );
    }

    #[test]
    fn test_rejects_nan_initial_angle() {
        let raw = RawParameterSet {
            theta1_0: f64::NAN,
            ..RawParameterSet::default()
        };
        assert!(matches!(
            ParameterSet::new(raw).unwrap_err(),
            ConfigError::NonFinite {
                field: "theta1_0",
                ..
            }
        ));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = ParameterSet::reference();
        let b = ParameterSet::reference();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_any_field() {
        let base = ParameterSet::reference();
        let tweaked = ParameterSet::new(RawParameterSet {
            l2: 0.474,
            ..RawParameterSet::default()
        })
        .unwrap();
        assert_ne!(base.fingerprint(), tweaked.fingerprint());

        let more_samples = ParameterSet::new(RawParameterSet {
            num_points: 4001,
            ..RawParameterSet::default()
        })
        .unwrap();
        assert_ne!(base.fingerprint(), more_samples.fingerprint());
    }

    #[test]
    fn test_serde_round_trip_revalidates() {
        let params = ParameterSet::reference();
        let json = serde_json::to_string(&params).unwrap();
        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);

        // A mutated document must fail validation on deserialize.
        let bad = json.replace("\"m1\":5.0", "\"m1\":-5.0");
        assert!(serde_json::from_str::<ParameterSet>(&bad).is_err());
    }
}
