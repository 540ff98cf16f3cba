#![deny(
    missing_docs,
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

//! `checkerboard_ising` simulates the classical 2D ising model on a periodic square lattice
//! using metropolis monte carlo, parallelized with a checkerboard decomposition.
//!
//! Sites are colored by `(row + col) % 2`. Every neighbor of a site has the opposite color, so a
//! half-sweep over one color can update all of its sites concurrently: each worker owns a
//! contiguous block of rows of that color and only reads the other color.
//!
//! It also offers a few feature gated modules:
//! - autocorrelation calculations on sampled magnetizations: use `autocorrelations`
//! - serialization of configurations, lattices and measurements using serde with the
//!   `serialize` feature.
//!
//! # Basic Example
//! ```
//! use checkerboard_ising::*;
//!
//! // 16x16 lattice at the critical temperature, 10 sweeps worth of single spin steps.
//! let config = SimulationConfig::new(16, 2.269, 16 * 16 * 10)
//!     .with_seed(1234)
//!     .with_workers(2);
//! let mut sim = Simulation::new(config).unwrap();
//!
//! let summary = sim.run();
//! assert_eq!(summary.sweeps, 10);
//! assert!(summary.final_state.sanity.is_ok());
//! assert!(summary.final_state.magnetization.abs() <= 1.0);
//! ```

/// Metropolis acceptance probabilities.
pub mod acceptance;
/// Autocorrelations of sampled observables.
#[cfg(feature = "autocorrelations")]
pub mod autocorrelations;
/// Errors produced while building or running a simulation.
pub mod error;
/// The spin lattice and its checkerboard layout.
pub mod lattice;
/// Energy and magnetization by direct summation.
pub mod observables;
/// Per-worker random number generation.
pub mod rng;
/// The top level simulation driver.
pub mod simulation;
/// Read-only colored snapshots of a lattice.
pub mod snapshot;
/// Simulation state owned by the driver.
pub mod state;
/// Checkerboard half-sweeps and the executors which run them.
pub mod sweep;
/// Encoders which turn snapshots into image files.
pub mod visualization;

pub use acceptance::AcceptanceTable;
#[cfg(feature = "autocorrelations")]
pub use autocorrelations::*;
pub use error::{IsingError, VisualizationError};
pub use lattice::{Color, Lattice, Spin};
pub use observables::*;
pub use rng::{RngArena, UniformSource, XorShift64};
pub use simulation::*;
pub use snapshot::{LatticeSnapshot, Rgb};
pub use state::SimulationState;
pub use sweep::{half_sweep, PartitionExecutor, RayonExecutor, SerialExecutor};
