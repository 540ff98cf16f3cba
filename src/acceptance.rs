#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Metropolis acceptance probabilities indexed by half the absolute neighbor sum.
///
/// Entry 0 is always 1, entries 1 and 2 are `exp(-4J/T)` and `exp(-8J/T)`. Only entries 1 and 2
/// are ever consulted since a zero neighbor sum means a zero energy change.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AcceptanceTable {
    probs: [f64; 3],
}

impl AcceptanceTable {
    /// Precompute the table for a coupling and temperature.
    pub fn new(coupling: f64, temperature: f64) -> Self {
        Self {
            probs: [
                1.0,
                (-4.0 * coupling / temperature).exp(),
                (-8.0 * coupling / temperature).exp(),
            ],
        }
    }

    /// Probability at an index, `|neighbor_sum| / 2`.
    pub fn get(&self, index: usize) -> f64 {
        self.probs[index]
    }

    /// Probability of accepting a flip against a given neighbor sum.
    pub fn for_neighbor_sum(&self, neighbor_sum: i32) -> f64 {
        self.probs[(neighbor_sum.unsigned_abs() / 2) as usize]
    }

    /// The raw table.
    pub fn as_array(&self) -> [f64; 3] {
        self.probs
    }

    /// Decide whether to flip given the energy change and a uniform draw in [0, 1). Non-increasing
    /// moves are always accepted, the draw is only consulted for positive energy changes.
    pub fn should_flip<F: FnOnce() -> f64>(&self, delta_e: f64, neighbor_sum: i32, draw: F) -> bool {
        // If dE <= 0 then it will always flip, don't bother drawing.
        if delta_e > 0.0 {
            draw() < self.for_neighbor_sum(neighbor_sum)
        } else {
            true
        }
    }
}
