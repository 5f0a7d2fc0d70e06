//! Video-based motion tracking for the double pendulum.
//!
//! Extracts the two marker light positions frame by frame: threshold to a
//! bright mask, pull out connected regions, resolve which region is which
//! marker (regions carry no persistent identity), and freeze a marker at
//! its previous position on a missed detection.

pub mod frame;
pub mod regions;
pub mod tracker;

pub use frame::{FixedPicker, FrameError, FrameSource, FrameStack, ImageDirSource, PointPicker};
pub use regions::{extract_regions, threshold_mask, Region};
pub use tracker::{load_or_track, track, MarkerId, MarkerTracker, TrackError, TrackerConfig};
