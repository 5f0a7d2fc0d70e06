//! Shared data model and persistence for the pendulum characterization suite.
//!
//! Holds the types that cross crate boundaries: pixel coordinates, marker
//! observations, the two cache record formats, and the file-backed record
//! store with atomic write semantics.

pub mod point;
pub mod records;
pub mod store;

pub use point::PixelPoint;
pub use records::{MarkerObservation, MarkerTrackRecord, RecordError, TrajectoryRecord};
pub use store::{RecordStore, StoreError};
