//! Track the pendulum markers in an extracted frame sequence.
//!
//! Reads grayscale frames from a directory, seeds the tracker with the
//! pivot and marker coordinates given on the command line (the stand-in
//! for interactive picking), and stores the finished marker track keyed by
//! the video name. A video that already has a cached record is not
//! reprocessed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use shared::{PixelPoint, RecordStore};
use tracker::{track, FixedPicker, FrameSource, ImageDirSource, PointPicker, TrackerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "track",
    about = "Extract the two marker series from a directory of video frames",
    long_about = None
)]
struct Args {
    /// Directory containing the extracted frames, in lexicographic order
    #[arg(long)]
    frames_dir: PathBuf,

    /// Frame rate of the recording in frames per second
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Cache key for the marker track record (defaults to the frames
    /// directory name)
    #[arg(long)]
    video_name: Option<String>,

    /// Directory holding cached marker track records
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Pivot pixel as "x,y"
    #[arg(long, value_parser = parse_point)]
    pivot: PixelPoint,

    /// First marker seed pixel as "x,y"
    #[arg(long, value_parser = parse_point)]
    first: PixelPoint,

    /// Second marker seed pixel as "x,y"
    #[arg(long, value_parser = parse_point)]
    second: PixelPoint,

    /// Use the low-aperture brightness cutoff (140 instead of 245)
    #[arg(long)]
    low_aperture: bool,
}

fn parse_point(text: &str) -> Result<PixelPoint, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {text:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(PixelPoint::new(x, y))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let video_name = match &args.video_name {
        Some(name) => name.clone(),
        None => args
            .frames_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string()),
    };

    let store = RecordStore::new(&args.data_dir);
    if let Some(cached) = store.get_marker_track(&video_name) {
        let record = cached?;
        println!(
            "{}: cached marker track found ({} frames), skipping processing",
            video_name,
            record.first.len()
        );
        return Ok(());
    }

    let mut source = ImageDirSource::open(&args.frames_dir, args.fps)?;

    // Frame 0 is the seed frame: consumed by point selection only.
    let seed_frame = source
        .next_frame()?
        .ok_or("frame source ended before the seed frame")?;
    let mut picker = FixedPicker::new(vec![args.pivot, args.first, args.second]);
    let pivot = picker.pick("pivot", &seed_frame)?;
    let seed_first = picker.pick("first marker", &seed_frame)?;
    let seed_second = picker.pick("second marker", &seed_frame)?;
    let arm_length_px = pivot.distance_to(&seed_first);

    let config = if args.low_aperture {
        TrackerConfig::low_aperture()
    } else {
        TrackerConfig::default()
    };

    let record = track(
        &mut source,
        pivot,
        seed_first,
        seed_second,
        arm_length_px,
        config,
    )?;
    let path = store.save_marker_track(&video_name, &record)?;

    println!(
        "{}: tracked {} frames (first-link length {:.1} px)",
        video_name,
        record.first.len(),
        arm_length_px
    );
    println!("record: {}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("track: {e}");
            ExitCode::FAILURE
        }
    }
}
