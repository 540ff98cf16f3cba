//! 2D Ising model CLI
//!
//! Runs a checkerboard metropolis simulation and prints a report, optionally writing images of the
//! initial and final lattices.

use checkerboard_ising::visualization::{ConvertEncoder, SnapshotEncoder};
use checkerboard_ising::{
    critical_temperature, Checkpoint, LatticeSnapshot, Simulation, SimulationConfig,
    DEFAULT_COUPLING, DEFAULT_SEED,
};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::Level;

const RULE: &str = "=================================================";
const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "ising")]
#[command(about = "2D Ising model, parallel checkerboard metropolis")]
#[command(after_help = "Example: ising 100 2.269 10000000\n\n\
Critical temperature: Tc = 2J/ln(1+√2) ≈ 2.26918531421")]
#[command(version)]
struct Cli {
    /// Lattice edge length L
    lattice_size: usize,

    /// Temperature T
    temperature: f64,

    /// Total single spin steps, rounded up to whole sweeps of L*L spins
    steps: u64,

    /// Coupling constant J
    #[arg(long, default_value_t = DEFAULT_COUPLING)]
    coupling: f64,

    /// Base seed for the worker generators
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of workers (defaults to the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Where to write the initial lattice image
    #[arg(long, default_value = "initial_state.png")]
    initial_image: PathBuf,

    /// Where to write the final lattice image
    #[arg(long, default_value = "final_state.png")]
    final_image: PathBuf,

    /// Skip writing images
    #[arg(long)]
    no_images: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    // A subscriber may already be installed when runs share a process.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_measurement(label: &str, checkpoint: &Checkpoint) {
    println!("{} energy: {:.4}", label, checkpoint.energy);
    println!("{} magnetization: {:.4}\n", label, checkpoint.magnetization);
}

fn print_sanity(stage: &str, checkpoint: &Checkpoint) {
    let sanity = &checkpoint.sanity;
    let (lo, hi) = sanity.energy_bounds();
    println!("Sanity check [{}]:", stage);
    if sanity.energy_ok() {
        println!(
            "  [OK] Energy per spin = {:.4} (within bounds [{:.2}, {:.2}])",
            sanity.energy_per_spin, lo, hi
        );
    } else {
        println!(
            "  [ERROR] Energy per spin ({:.4}) outside expected bounds [{:.2}, {:.2}]",
            sanity.energy_per_spin, lo, hi
        );
    }
    if sanity.magnetization_ok() {
        println!(
            "  [OK] Magnetization per spin = {:.4} (within bounds [-1, 1])",
            sanity.magnetization_per_spin
        );
    } else {
        println!(
            "  [ERROR] Magnetization per spin ({:.4}) outside physical bounds [-1, 1]",
            sanity.magnetization_per_spin
        );
    }
    println!();
}

fn save_image(encoder: &ConvertEncoder, snapshot: &LatticeSnapshot, name: &Path) {
    match encoder.encode(snapshot, name) {
        Ok(artifact) if artifact.fell_back => println!(
            "Saved visualization to {} (install ImageMagick for PNG)",
            artifact.path.display()
        ),
        Ok(artifact) => println!("Saved visualization to {}", artifact.path.display()),
        Err(e) => {
            tracing::error!(error = %e, path = %name.display(), "Could not save visualization");
            println!("Error: could not save visualization to {}", name.display());
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SimulationConfig::new(cli.lattice_size, cli.temperature, cli.steps)
        .with_coupling(cli.coupling)
        .with_seed(cli.seed);
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    config.validate()?;

    let mut sim = Simulation::new(config)?;
    let l = config.size;

    println!("2D Ising Model");
    println!("{}", RULE);
    println!("Lattice size: {} x {} ({} spins)", l, l, l * l);
    println!(
        "Temperature: T = {:.4} (Tc ≈ {:.3})",
        config.temperature,
        critical_temperature(config.coupling)
    );
    println!("Coupling constant: J = {:.2}", config.coupling);
    println!("Single-spin steps requested: {}", config.steps);
    println!("Equivalent Monte Carlo sweeps: {}", config.sweeps());
    println!("Workers: {}", sim.num_workers());
    println!("{}\n", RULE);

    let encoder = ConvertEncoder::default();
    let initial = sim.checkpoint();
    print_measurement("Initial", &initial);
    print_sanity("Initial state", &initial);
    if !cli.no_images {
        save_image(&encoder, &sim.snapshot(), &cli.initial_image);
    }

    let start = Instant::now();
    let summary = sim.run();
    let elapsed = start.elapsed();

    println!();
    print_measurement("Final", &summary.final_state);
    print_sanity("Final state", &summary.final_state);
    println!("Total time: {:.6} seconds\n", elapsed.as_secs_f64());

    if !cli.no_images {
        save_image(&encoder, &sim.snapshot(), &cli.final_image);
    }
    Ok(())
}

/// Help and version requests succeed, every other parse failure is a usage error.
fn parse_status(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
        _ => EXIT_FAILURE,
    }
}

/// Parse `args`, run, and return the process exit status.
fn run_cli<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return parse_status(&e);
        }
    };
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

fn main() -> ExitCode {
    ExitCode::from(run_cli(std::env::args_os()))
}
