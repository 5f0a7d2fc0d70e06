//! Frame sources and interactive point selection seams.
//!
//! The tracker consumes grayscale frames one at a time in input order.
//! Seed point selection is modeled as one blocking call returning a single
//! pixel coordinate; no shared mutable callback state.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use shared::PixelPoint;
use thiserror::Error;

/// Failures reading frames or picking points.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("no frames found under {0}")]
    EmptyDirectory(PathBuf),

    #[error("no more pre-supplied points to pick")]
    PickerExhausted,
}

/// A source of successive grayscale raster frames.
///
/// Frames are `Array2<u8>` indexed `[row, col]` (row = y down, col = x).
pub trait FrameSource {
    /// Frames per second of the underlying recording.
    fn frame_rate(&self) -> f64;

    /// The next frame in input order, or `None` at the end of the feed.
    fn next_frame(&mut self) -> Result<Option<Array2<u8>>, FrameError>;
}

/// In-memory frame source, mainly for tests and synthetic footage.
pub struct FrameStack {
    frames: VecDeque<Array2<u8>>,
    fps: f64,
}

impl FrameStack {
    pub fn new(frames: Vec<Array2<u8>>, fps: f64) -> Self {
        Self {
            frames: frames.into(),
            fps,
        }
    }
}

impl FrameSource for FrameStack {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Array2<u8>>, FrameError> {
        Ok(self.frames.pop_front())
    }
}

/// Frame source reading an extracted image sequence from a directory.
///
/// Files are consumed in lexicographic name order, so zero-padded frame
/// numbers preserve the recording order.
pub struct ImageDirSource {
    paths: VecDeque<PathBuf>,
    fps: f64,
}

const FRAME_EXTENSIONS: [&str; 6] = ["png", "pgm", "jpg", "jpeg", "bmp", "tif"];

impl ImageDirSource {
    /// Open a directory of frame images recorded at the given rate.
    pub fn open(dir: &Path, fps: f64) -> Result<Self, FrameError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        if paths.is_empty() {
            return Err(FrameError::EmptyDirectory(dir.to_path_buf()));
        }
        paths.sort();
        Ok(Self {
            paths: paths.into(),
            fps,
        })
    }
}

impl FrameSource for ImageDirSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Array2<u8>>, FrameError> {
        let path = match self.paths.pop_front() {
            Some(path) => path,
            None => return Ok(None),
        };
        let gray = image::open(&path)?.into_luma8();
        let (width, height) = gray.dimensions();
        let frame = Array2::from_shape_vec((height as usize, width as usize), gray.into_raw())
            .expect("luma8 buffer matches its reported dimensions");
        Ok(Some(frame))
    }
}

/// One-shot interactive point selection.
///
/// A single blocking call per point; implementations own whatever UI state
/// they need internally.
pub trait PointPicker {
    /// Ask for one pixel coordinate on the given frame.
    fn pick(&mut self, prompt: &str, frame: &Array2<u8>) -> Result<PixelPoint, FrameError>;
}

/// Picker that hands out pre-supplied coordinates, for non-interactive runs.
pub struct FixedPicker {
    points: VecDeque<PixelPoint>,
}

impl FixedPicker {
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self {
            points: points.into(),
        }
    }
}

impl PointPicker for FixedPicker {
    fn pick(&mut self, prompt: &str, _frame: &Array2<u8>) -> Result<PixelPoint, FrameError> {
        let point = self.points.pop_front().ok_or(FrameError::PickerExhausted)?;
        log::debug!("picked {prompt}: ({}, {})", point.x, point.y);
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_frame_stack_preserves_order() {
        let mut source = FrameStack::new(
            vec![
                Array2::from_elem((2, 2), 1u8),
                Array2::from_elem((2, 2), 2u8),
            ],
            30.0,
        );
        assert_eq!(source.frame_rate(), 30.0);
        assert_eq!(source.next_frame().unwrap().unwrap()[[0, 0]], 1);
        assert_eq!(source.next_frame().unwrap().unwrap()[[0, 0]], 2);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_dir_source_reads_sorted_grayscale() {
        let dir = TempDir::new().unwrap();
        for (name, level) in [("frame_0002.png", 200u8), ("frame_0001.png", 100u8)] {
            let img = image::GrayImage::from_pixel(4, 3, image::Luma([level]));
            img.save(dir.path().join(name)).unwrap();
        }

        let mut source = ImageDirSource::open(dir.path(), 60.0).unwrap();
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.dim(), (3, 4));
        assert_eq!(first[[0, 0]], 100);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second[[0, 0]], 200);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_dir_source_rejects_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ImageDirSource::open(dir.path(), 30.0),
            Err(FrameError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn test_fixed_picker_hands_out_points_then_exhausts() {
        let frame = Array2::zeros((2, 2));
        let mut picker = FixedPicker::new(vec![PixelPoint::new(1.0, 2.0)]);
        let p = picker.pick("pivot", &frame).unwrap();
        assert_eq!(p, PixelPoint::new(1.0, 2.0));
        assert!(matches!(
            picker.pick("first marker", &frame),
            Err(FrameError::PickerExhausted)
        ));
    }
}
