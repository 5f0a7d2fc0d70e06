//! File-backed key-value store for cache records.
//!
//! One directory holds every record; keys map to file names. Records are
//! append-only: a record is written once for its key and re-read on later
//! runs with the same key. Writes go to a uniquely named temporary file in
//! the same directory which is then renamed into place, so a concurrent
//! reader never observes a partially written record, even when two writers
//! target the same key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::records::{MarkerTrackRecord, RecordError, TrajectoryRecord};

/// Errors from record storage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// File-backed store for trajectory and marker-track records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root_path: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on the first write.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Root directory of the store
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn trajectory_path(&self, fingerprint: &str) -> PathBuf {
        self.root_path.join(format!("simulation_{fingerprint}.txt"))
    }

    fn marker_track_path(&self, video_name: &str) -> PathBuf {
        self.root_path.join(format!("{video_name}.txt"))
    }

    /// Get the trajectory record cached for a parameter fingerprint.
    ///
    /// Returns None if no record exists for this fingerprint.
    /// Returns Some(Err) if the record exists but cannot be loaded.
    pub fn get_trajectory(&self, fingerprint: &str) -> Option<Result<TrajectoryRecord, StoreError>> {
        let path = self.trajectory_path(fingerprint);
        if !path.exists() {
            debug!("no cached trajectory for fingerprint {fingerprint}");
            return None;
        }
        info!("loading cached trajectory from {}", path.display());
        Some(
            fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|text| TrajectoryRecord::from_json(&text).map_err(StoreError::from)),
        )
    }

    /// Save a trajectory record under a parameter fingerprint.
    ///
    /// Returns the path the record was written to.
    pub fn save_trajectory(
        &self,
        fingerprint: &str,
        record: &TrajectoryRecord,
    ) -> Result<PathBuf, StoreError> {
        let path = self.trajectory_path(fingerprint);
        self.write_atomically(&path, &record.to_json()?)?;
        info!("stored trajectory record at {}", path.display());
        Ok(path)
    }

    /// Get the marker track cached for a video.
    ///
    /// Returns None if the video has not been tracked yet.
    /// Returns Some(Err) if the record exists but cannot be loaded.
    pub fn get_marker_track(
        &self,
        video_name: &str,
    ) -> Option<Result<MarkerTrackRecord, StoreError>> {
        let path = self.marker_track_path(video_name);
        if !path.exists() {
            debug!("no cached marker track for video {video_name}");
            return None;
        }
        info!("loading cached marker track from {}", path.display());
        Some(
            fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|text| MarkerTrackRecord::from_document(&text).map_err(StoreError::from)),
        )
    }

    /// Save a marker track record under a video identity.
    ///
    /// Returns the path the record was written to.
    pub fn save_marker_track(
        &self,
        video_name: &str,
        record: &MarkerTrackRecord,
    ) -> Result<PathBuf, StoreError> {
        let path = self.marker_track_path(video_name);
        self.write_atomically(&path, &record.to_document()?)?;
        info!("stored marker track record at {}", path.display());
        Ok(path)
    }

    /// Write content to a uniquely named temporary file in the store
    /// directory, then rename into place. The unique name keeps two
    /// writers for the same key from truncating each other's staging
    /// file; the rename itself is atomic.
    fn write_atomically(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root_path)?;
        let mut tmp = NamedTempFile::new_in(&self.root_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
