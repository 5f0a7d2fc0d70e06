//! Cache record formats.
//!
//! Two record types are persisted between runs: the simulated trajectory
//! (JSON document keyed by the parameter fingerprint) and the marker track
//! extracted from a video (tagged-line document keyed by video identity).
//! Records are loaded and stored whole, never streamed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::point::PixelPoint;

/// Malformed record content.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trajectory record is inconsistent: {0}")]
    InconsistentTrajectory(String),

    #[error("marker track record is missing its `{0}` section")]
    MissingSection(&'static str),

    #[error("marker track record has an untagged line: {0:?}")]
    UntaggedLine(String),
}

/// One tracked marker in one frame: timestamp, bearing angle in radians
/// and the pixel position the angle was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerObservation {
    /// Seconds since the start of the video.
    pub time: f64,
    /// Bearing in radians (from the pivot for the first marker, from the
    /// first marker's current position for the second).
    pub angle: f64,
    /// Pixel position of the marker centroid.
    pub position: PixelPoint,
}

impl MarkerObservation {
    pub fn new(time: f64, angle: f64, position: PixelPoint) -> Self {
        Self {
            time,
            angle,
            position,
        }
    }
}

/// Wire form of a marker observation: `[t, angle, [x, y]]`.
type ObservationTriple = (f64, f64, (f64, f64));

impl From<MarkerObservation> for ObservationTriple {
    fn from(obs: MarkerObservation) -> Self {
        (obs.time, obs.angle, (obs.position.x, obs.position.y))
    }
}

impl From<ObservationTriple> for MarkerObservation {
    fn from((time, angle, (x, y)): ObservationTriple) -> Self {
        Self {
            time,
            angle,
            position: PixelPoint::new(x, y),
        }
    }
}

/// A whole simulated trajectory as stored on disk.
///
/// `y` holds the four state rows (theta1, theta2, omega1, omega2), each with
/// one entry per sample in `t`. `lengths` are the two link lengths in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub y: [Vec<f64>; 4],
    pub t: Vec<f64>,
    pub lengths: [f64; 2],
}

impl TrajectoryRecord {
    /// Parse from a JSON document and check internal consistency.
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_str(text)?;
        let n = record.t.len();
        for (i, row) in record.y.iter().enumerate() {
            if row.len() != n {
                return Err(RecordError::InconsistentTrajectory(format!(
                    "state row {} has {} samples but t has {}",
                    i,
                    row.len(),
                    n
                )));
            }
        }
        Ok(record)
    }

    /// Serialize to the JSON document form.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A whole marker track as stored on disk: the pivot pixel plus the two
/// ordered marker observation sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerTrackRecord {
    pub pivot: PixelPoint,
    pub first: Vec<MarkerObservation>,
    pub second: Vec<MarkerObservation>,
}

impl MarkerTrackRecord {
    pub fn new(
        pivot: PixelPoint,
        first: Vec<MarkerObservation>,
        second: Vec<MarkerObservation>,
    ) -> Self {
        Self {
            pivot,
            first,
            second,
        }
    }

    /// Serialize to the tagged-line document form:
    ///
    /// ```text
    /// Pivot:[x, y]
    /// firstLED:[[t, angle, [x, y]], ...]
    /// secondLED:[[t, angle, [x, y]], ...]
    /// ```
    pub fn to_document(&self) -> Result<String, RecordError> {
        let pivot = serde_json::to_string(&(self.pivot.x, self.pivot.y))?;
        let first = serde_json::to_string(&triples(&self.first))?;
        let second = serde_json::to_string(&triples(&self.second))?;
        Ok(format!(
            "Pivot:{}\nfirstLED:{}\nsecondLED:{}",
            pivot, first, second
        ))
    }

    /// Parse the tagged-line document form.
    pub fn from_document(text: &str) -> Result<Self, RecordError> {
        let mut pivot: Option<PixelPoint> = None;
        let mut first: Option<Vec<MarkerObservation>> = None;
        let mut second: Option<Vec<MarkerObservation>> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| RecordError::UntaggedLine(line.to_string()))?;
            match key.trim() {
                "Pivot" => {
                    let (x, y): (f64, f64) = serde_json::from_str(value.trim())?;
                    pivot = Some(PixelPoint::new(x, y));
                }
                "firstLED" => first = Some(observations(value)?),
                "secondLED" => second = Some(observations(value)?),
                _ => return Err(RecordError::UntaggedLine(line.to_string())),
            }
        }

        Ok(Self {
            pivot: pivot.ok_or(RecordError::MissingSection("Pivot"))?,
            first: first.ok_or(RecordError::MissingSection("firstLED"))?,
            second: second.ok_or(RecordError::MissingSection("secondLED"))?,
        })
    }
}

fn triples(observations: &[MarkerObservation]) -> Vec<ObservationTriple> {
    observations.iter().map(|&o| o.into()).collect()
}

fn observations(value: &str) -> Result<Vec<MarkerObservation>, RecordError> {
    let raw: Vec<ObservationTriple> = serde_json::from_str(value.trim())?;
    Ok(raw.into_iter().map(MarkerObservation::from).collect())
}
