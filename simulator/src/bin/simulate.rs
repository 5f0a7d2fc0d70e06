//! Run one pendulum simulation and cache the trajectory.
//!
//! Integrates the equations of motion for a parameter file (or the built-in
//! reference configuration), stores the result keyed by its parameter
//! fingerprint, and reports the energy drift of the run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simulator::{load_or_integrate, ParameterSet, PendulumSystem};
use shared::RecordStore;

#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Integrate the double pendulum equations of motion and cache the trajectory",
    long_about = None
)]
struct Args {
    /// JSON file with the simulation parameters (defaults to the built-in
    /// reference configuration)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory holding cached trajectory records
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
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
    let fingerprint = params.fingerprint();
    println!("parameter fingerprint: {fingerprint}");

    let trajectory = load_or_integrate(&store, &params)?;
    let system = PendulumSystem::from_params(&params);

    println!(
        "trajectory: {} samples over [{}, {}] s",
        trajectory.len(),
        params.t_start(),
        params.t_end()
    );
    println!(
        "max relative energy drift: {:.3e}",
        trajectory.max_energy_drift(&system)
    );
    println!(
        "record: {}",
        args.data_dir
            .join(format!("simulation_{fingerprint}.txt"))
            .display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("simulate: {e}");
            ExitCode::FAILURE
        }
    }
}
