//! Frame-by-frame marker identity resolution.
//!
//! Detected regions carry no persistent identity, so each frame the tracker
//! decides which region is the first marker (on the link-1 tip) and which
//! is the second (on the link-2 tip). The canonical rule combines a
//! geometric band test against the known first-link pixel length with a
//! temporal test against the previous frame's positions; an earlier
//! nearest-previous-position-only rule is superseded and intentionally not
//! implemented.

use log::{debug, info, warn};
use ndarray::ArrayView2;
use thiserror::Error;

use shared::{MarkerObservation, MarkerTrackRecord, PixelPoint, RecordStore, StoreError};

use crate::frame::{FrameError, FrameSource};
use crate::regions::{extract_regions, threshold_mask, Region};

/// Failures while tracking a video.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Detection and identity-resolution tuning.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Brightness cutoff for the binary mask. Video-dependent: 140 suits
    /// low-aperture footage, 245 everything else.
    pub brightness_cutoff: u8,
    /// Regions smaller than this pixel area are noise.
    pub min_area: usize,
    /// Regions larger than this pixel area are glare.
    pub max_area: usize,
    /// Half-width of the accepted band around the first-link pixel length.
    pub arm_band_px: f64,
    /// Slack added to the previous second-marker distance in the temporal
    /// test.
    pub temporal_slack_px: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            brightness_cutoff: 245,
            min_area: 5,
            max_area: 500,
            arm_band_px: 20.0,
            temporal_slack_px: 20.0,
        }
    }
}

impl TrackerConfig {
    /// Preset for low-aperture recordings where the markers sit well below
    /// full brightness.
    pub fn low_aperture() -> Self {
        Self {
            brightness_cutoff: 140,
            ..Self::default()
        }
    }
}

/// Marker identity assigned to a region within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerId {
    First,
    Second,
}

/// Tracks the two markers across frames.
///
/// The only state carried between frames is the last accepted position of
/// each marker, seeded from the user-picked points.
#[derive(Debug, Clone)]
pub struct MarkerTracker {
    pivot: PixelPoint,
    arm_length_px: f64,
    previous_first: PixelPoint,
    previous_second: PixelPoint,
    config: TrackerConfig,
}

impl MarkerTracker {
    /// Seed the tracker with the pivot, the two initial marker positions
    /// and the first-link length in pixels.
    pub fn new(
        pivot: PixelPoint,
        seed_first: PixelPoint,
        seed_second: PixelPoint,
        arm_length_px: f64,
        config: TrackerConfig,
    ) -> Self {
        Self {
            pivot,
            arm_length_px,
            previous_first: seed_first,
            previous_second: seed_second,
            config,
        }
    }

    /// Classify one candidate region.
    ///
    /// A region is the first marker iff its pivot distance lies within the
    /// arm-length band AND it sits closer to the previous first-marker
    /// position than the previous second-marker distance plus the slack.
    /// Everything else is the second marker.
    pub fn classify(&self, region: &Region) -> MarkerId {
        let distance_from_pivot = region.centroid.distance_to(&self.pivot);
        let from_previous_first = region.centroid.distance_to(&self.previous_first);
        let from_previous_second = region.centroid.distance_to(&self.previous_second);

        let in_band = (distance_from_pivot - self.arm_length_px).abs() <= self.config.arm_band_px;
        let temporally_first =
            from_previous_first < from_previous_second + self.config.temporal_slack_px;

        if in_band && temporally_first {
            MarkerId::First
        } else {
            MarkerId::Second
        }
    }

    /// Process one frame and return the two observations.
    ///
    /// A marker with no accepted region this frame is frozen at its
    /// previous position; no interpolation.
    pub fn observe_frame(
        &mut self,
        frame: ArrayView2<u8>,
        frame_index: usize,
        frame_rate: f64,
    ) -> (MarkerObservation, MarkerObservation) {
        let mask = threshold_mask(frame, self.config.brightness_cutoff);
        let regions = extract_regions(mask.view());

        let mut current_first: Option<PixelPoint> = None;
        let mut current_second: Option<PixelPoint> = None;
        let mut candidates = 0usize;

        for region in &regions {
            if region.area < self.config.min_area || region.area > self.config.max_area {
                continue;
            }
            candidates += 1;
            // Later candidates overwrite earlier ones for the same role.
            match self.classify(region) {
                MarkerId::First => current_first = Some(region.centroid),
                MarkerId::Second => current_second = Some(region.centroid),
            }
        }

        if candidates != 2 {
            debug!("frame {frame_index}: {candidates} plausible regions (expected 2)");
        }
        if current_first.is_none() {
            warn!("frame {frame_index}: first marker not detected, holding previous position");
        }
        if current_second.is_none() {
            warn!("frame {frame_index}: second marker not detected, holding previous position");
        }

        let first = current_first.unwrap_or(self.previous_first);
        let second = current_second.unwrap_or(self.previous_second);

        let time = frame_index as f64 / frame_rate;
        let theta1 = self.pivot.bearing_to(&first);
        // Joint-relative: bearing from the first marker's current position.
        let theta2 = first.bearing_to(&second);

        self.previous_first = first;
        self.previous_second = second;

        (
            MarkerObservation::new(time, theta1, first),
            MarkerObservation::new(time, theta2, second),
        )
    }
}

/// Track every frame of a source and return the finished marker record.
///
/// The seed frame is frame 0 (consumed by point selection before tracking
/// starts), so the first tracked frame carries index 1.
pub fn track<S: FrameSource>(
    source: &mut S,
    pivot: PixelPoint,
    seed_first: PixelPoint,
    seed_second: PixelPoint,
    arm_length_px: f64,
    config: TrackerConfig,
) -> Result<MarkerTrackRecord, TrackError> {
    let frame_rate = source.frame_rate();
    let mut tracker = MarkerTracker::new(pivot, seed_first, seed_second, arm_length_px, config);

    let mut first_series = Vec::new();
    let mut second_series = Vec::new();
    let mut frame_index = 0usize;

    while let Some(frame) = source.next_frame()? {
        frame_index += 1;
        let (first, second) = tracker.observe_frame(frame.view(), frame_index, frame_rate);
        first_series.push(first);
        second_series.push(second);
    }
    info!("tracked {frame_index} frames at {frame_rate} fps");

    Ok(MarkerTrackRecord::new(pivot, first_series, second_series))
}

/// Return the cached marker track for a video, tracking and storing a
/// fresh one only when no usable record exists.
#[allow(clippy::too_many_arguments)]
pub fn load_or_track<S: FrameSource>(
    store: &RecordStore,
    video_name: &str,
    source: &mut S,
    pivot: PixelPoint,
    seed_first: PixelPoint,
    seed_second: PixelPoint,
    arm_length_px: f64,
    config: TrackerConfig,
) -> Result<MarkerTrackRecord, TrackError> {
    match store.get_marker_track(video_name) {
        Some(Ok(record)) => {
            info!("marker track cache hit for {video_name}");
            return Ok(record);
        }
        Some(Err(e)) => {
            warn!("discarding unreadable marker track for {video_name}: {e}");
        }
        None => {
            info!("marker track cache miss for {video_name}");
        }
    }

    let record = track(source, pivot, seed_first, seed_second, arm_length_px, config)?;
    store.save_marker_track(video_name, &record)?;
    Ok(record)
}
