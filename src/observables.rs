use crate::lattice::Lattice;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Slack on the energy per spin bounds before a state is reported as unphysical.
pub const ENERGY_TOLERANCE: f64 = 0.01;
/// Largest magnetization per spin before a state is reported as unphysical.
pub const MAGNETIZATION_BOUND: f64 = 1.01;

/// Total energy `-J sum_<ij> s_i s_j` by direct summation. Each bond is visited from both ends so
/// the grand total is halved.
pub fn total_energy(lattice: &Lattice, coupling: f64) -> f64 {
    let energy = lattice
        .iter()
        .map(|(row, col, spin)| {
            -coupling * f64::from(spin) * f64::from(lattice.neighbor_sum(row, col))
        })
        .sum::<f64>();
    0.5 * energy
}

/// Sum of spins divided by the number of sites.
pub fn mean_magnetization(lattice: &Lattice) -> f64 {
    let total = lattice
        .iter()
        .map(|(_, _, spin)| i64::from(spin))
        .sum::<i64>();
    total as f64 / lattice.num_sites() as f64
}

/// Critical temperature of the square lattice ising model, `2J / ln(1 + sqrt(2))`.
pub fn critical_temperature(coupling: f64) -> f64 {
    2.0 * coupling / (1.0 + 2f64.sqrt()).ln()
}

/// Energy and magnetization at a point in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Total energy.
    pub energy: f64,
    /// Mean magnetization per spin.
    pub magnetization: f64,
}

impl Measurement {
    /// Measure a lattice from scratch.
    pub fn of(lattice: &Lattice, coupling: f64) -> Self {
        Self {
            energy: total_energy(lattice, coupling),
            magnetization: mean_magnetization(lattice),
        }
    }
}

/// Advisory bounds check on a measured state.
///
/// These catch bookkeeping bugs, not runtime faults, so a failure is never fatal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SanityCheck {
    /// Energy divided by the number of sites.
    pub energy_per_spin: f64,
    /// Mean magnetization per spin.
    pub magnetization_per_spin: f64,
    /// The coupling the bounds are scaled by.
    pub coupling: f64,
}

impl SanityCheck {
    /// Check a total energy and mean magnetization for a lattice of `sites` spins.
    pub fn evaluate(energy: f64, magnetization: f64, coupling: f64, sites: usize) -> Self {
        Self {
            energy_per_spin: energy / sites as f64,
            magnetization_per_spin: magnetization,
            coupling,
        }
    }

    /// The physical energy per spin bounds, `[-2J, 2J]`.
    pub fn energy_bounds(&self) -> (f64, f64) {
        (-2.0 * self.coupling, 2.0 * self.coupling)
    }

    /// Whether the energy per spin is within bounds, with a little slack.
    pub fn energy_ok(&self) -> bool {
        let (lo, hi) = self.energy_bounds();
        self.energy_per_spin >= lo - ENERGY_TOLERANCE && self.energy_per_spin <= hi + ENERGY_TOLERANCE
    }

    /// Whether `|m| <= 1`, with a little slack.
    pub fn magnetization_ok(&self) -> bool {
        self.magnetization_per_spin.abs() <= MAGNETIZATION_BOUND
    }

    /// Both checks pass.
    pub fn is_ok(&self) -> bool {
        self.energy_ok() && self.magnetization_ok()
    }

    /// Log any failed checks as warnings.
    pub fn log_violations(&self, stage: &str) {
        if !self.energy_ok() {
            let (lo, hi) = self.energy_bounds();
            tracing::warn!(
                stage,
                energy_per_spin = self.energy_per_spin,
                lo,
                hi,
                "Energy per spin outside expected bounds"
            );
        }
        if !self.magnetization_ok() {
            tracing::warn!(
                stage,
                magnetization_per_spin = self.magnetization_per_spin,
                "Magnetization per spin outside physical bounds"
            );
        }
    }
}
