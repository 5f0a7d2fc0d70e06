//! Compare a tracked recording against its simulation.
//!
//! Loads the marker-track record for a video, loads or integrates the
//! trajectory for a parameter set, aligns the two per arm, and writes the
//! deviation chart plus per-arm fit comparison charts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use shared::RecordStore;
use simulator::{load_or_integrate, ParameterSet};
use verification::plot::{render_chart, NamedSeries};
use verification::{
    align_arm, deviation_series, trajectory_angle_series, AlignConfig, AlignMode, AngleSeries,
    ArmAlignment,
};

#[derive(Parser, Debug)]
#[command(
    name = "compare",
    about = "Align tracked pendulum motion against a simulated trajectory",
    long_about = None
)]
struct Args {
    /// Video name whose marker-track record to compare
    #[arg(long)]
    video: String,

    /// JSON file with the simulation parameters (defaults to the built-in
    /// reference configuration)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory holding cached records
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory receiving the rendered charts
    #[arg(long, default_value = "ver_out")]
    out_dir: PathBuf,

    /// Fourier harmonics per fit
    #[arg(long, default_value_t = verification::DEFAULT_NUM_TERMS)]
    num_terms: usize,

    /// Re-zero the simulated axis at the measured onset instead of
    /// truncating it in place
    #[arg(long)]
    rezero: bool,
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

fn fit_comparison_chart(
    path: &PathBuf,
    title: &str,
    alignment: &ArmAlignment,
) -> Result<(), Box<dyn std::error::Error>> {
    let measured_fit = alignment
        .measured_fit
        .model
        .evaluate_grid(&alignment.measured.t);
    let simulated_fit = alignment
        .simulated_fit
        .model
        .evaluate_grid(&alignment.simulated.t);
    render_chart(
        path,
        title,
        "Angle (degrees)",
        &[
            NamedSeries {
                label: "Video Data",
                t: &alignment.measured.t,
                values: &alignment.measured.angles,
            },
            NamedSeries {
                label: "Video Fourier Fit",
                t: &alignment.measured.t,
                values: &measured_fit,
            },
            NamedSeries {
                label: "Simulation Data",
                t: &alignment.simulated.t,
                values: &alignment.simulated.angles,
            },
            NamedSeries {
                label: "Simulation Fourier Fit",
                t: &alignment.simulated.t,
                values: &simulated_fit,
            },
        ],
    )
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let params = match &args.params {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<ParameterSet>(&text)?
        }
        None => ParameterSet::reference(),
    };

    let store = RecordStore::new(&args.data_dir);
    let track = match store.get_marker_track(&args.video) {
        Some(record) => record?,
        None => return Err(format!("no marker-track record for '{}'", args.video).into()),
    };
    let trajectory = load_or_integrate(&store, &params)?;
    let (sim_arm1, sim_arm2) = trajectory_angle_series(&trajectory);

    let config = AlignConfig {
        mode: if args.rezero {
            AlignMode::RezeroSimulated
        } else {
            AlignMode::TruncateToMeasured
        },
        num_terms: args.num_terms,
        ..AlignConfig::default()
    };
    let arm1 = align_arm(&AngleSeries::from_observations(&track.first), &sim_arm1, &config);
    let arm2 = align_arm(&AngleSeries::from_observations(&track.second), &sim_arm2, &config);

    for (arm, fit_name) in [(&arm1, "arm 1"), (&arm2, "arm 2")] {
        if !arm.measured_fit.converged || !arm.simulated_fit.converged {
            eprintln!("warning: {fit_name} fit did not fully converge; deviation is approximate");
        }
    }

    std::fs::create_dir_all(&args.out_dir)?;
    fit_comparison_chart(
        &args.out_dir.join("fourier_comparison_arm1.png"),
        "Arm 1 - Fourier Series Comparison",
        &arm1,
    )?;
    fit_comparison_chart(
        &args.out_dir.join("fourier_comparison_arm2.png"),
        "Arm 2 - Fourier Series Comparison",
        &arm2,
    )?;

    let deviations = deviation_series(&[arm1, arm2], config.grid_points);
    render_chart(
        &args.out_dir.join("fourier_deviation.png"),
        "Verification of the Simulation with Respect to Real Life",
        "Angle Difference (degrees)",
        &[
            NamedSeries::from_deviation("Arm 1 Deviation", &deviations[0]),
            NamedSeries::from_deviation("Arm 2 Deviation", &deviations[1]),
        ],
    )?;

    println!(
        "arm 1 rms deviation: {:.3} deg over {} grid points",
        rms(&deviations[0].deviation),
        deviations[0].t.len()
    );
    println!(
        "arm 2 rms deviation: {:.3} deg over {} grid points",
        rms(&deviations[1].deviation),
        deviations[1].t.len()
    );
    println!("charts written to {}", args.out_dir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("compare: {e}");
            ExitCode::FAILURE
        }
    }
}
