use crate::acceptance::AcceptanceTable;
use crate::error::IsingError;
use crate::lattice::Lattice;
use crate::observables::{mean_magnetization, total_energy, Measurement};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Everything a run mutates: the lattice, its parameters, the derived acceptance table and the
/// incrementally tracked energy.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SimulationState {
    lattice: Lattice,
    coupling: f64,
    temperature: f64,
    table: AcceptanceTable,
    running_energy: f64,
}

impl SimulationState {
    /// Wrap a lattice. The running energy starts from a full recomputation.
    pub fn new(lattice: Lattice, coupling: f64, temperature: f64) -> Result<Self, IsingError> {
        check_coupling(coupling)?;
        check_temperature(temperature)?;
        let running_energy = total_energy(&lattice, coupling);
        Ok(Self {
            lattice,
            coupling,
            temperature,
            table: AcceptanceTable::new(coupling, temperature),
            running_energy,
        })
    }

    /// The spin lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub(crate) fn lattice_mut(&mut self) -> &mut Lattice {
        &mut self.lattice
    }

    /// Coupling constant J.
    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    /// Temperature T.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Acceptance table for the current J and T.
    pub fn table(&self) -> &AcceptanceTable {
        &self.table
    }

    /// Energy tracked by summing accepted moves.
    pub fn running_energy(&self) -> f64 {
        self.running_energy
    }

    /// Change the temperature and recompute the acceptance table.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), IsingError> {
        check_temperature(temperature)?;
        self.temperature = temperature;
        self.table = AcceptanceTable::new(self.coupling, self.temperature);
        Ok(())
    }

    /// Change the coupling, recompute the acceptance table and the energy.
    pub fn set_coupling(&mut self, coupling: f64) -> Result<(), IsingError> {
        check_coupling(coupling)?;
        self.coupling = coupling;
        self.table = AcceptanceTable::new(self.coupling, self.temperature);
        self.running_energy = total_energy(&self.lattice, coupling);
        Ok(())
    }

    /// Add the energy change of a half-sweep.
    pub(crate) fn add_energy(&mut self, delta: f64) {
        self.running_energy += delta;
    }

    /// Recompute the energy from scratch.
    pub fn recompute_energy(&self) -> f64 {
        total_energy(&self.lattice, self.coupling)
    }

    /// Mean magnetization per spin.
    pub fn magnetization(&self) -> f64 {
        mean_magnetization(&self.lattice)
    }

    /// Full recomputation of both observables.
    pub fn measure(&self) -> Measurement {
        Measurement::of(&self.lattice, self.coupling)
    }

    /// Relative difference between the running and recomputed energies.
    pub fn energy_drift(&self) -> f64 {
        let exact = self.recompute_energy();
        (self.running_energy - exact).abs() / exact.abs().max(1.0)
    }
}

pub(crate) fn check_temperature(temperature: f64) -> Result<(), IsingError> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(IsingError::InvalidTemperature(temperature))
    }
}

pub(crate) fn check_coupling(coupling: f64) -> Result<(), IsingError> {
    if coupling.is_finite() && coupling > 0.0 {
        Ok(())
    } else {
        Err(IsingError::InvalidCoupling(coupling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_temperature_updates_table() {
        let lattice = Lattice::new_uniform(4, 1).unwrap();
        let mut state = SimulationState::new(lattice, 1.0, 1.0).unwrap();
        state.set_temperature(4.0).unwrap();
        assert_eq!(*state.table(), AcceptanceTable::new(1.0, 4.0));
        assert!(state.set_temperature(0.0).is_err());
        assert!(state.set_temperature(f64::NAN).is_err());
        assert_eq!(state.temperature(), 4.0);
    }

    #[test]
    fn test_set_coupling_rescales_energy() {
        let lattice = Lattice::new_uniform(4, 1).unwrap();
        let mut state = SimulationState::new(lattice, 1.0, 1.0).unwrap();
        assert_eq!(state.running_energy(), -32.0);
        state.set_coupling(2.0).unwrap();
        assert_eq!(state.running_energy(), -64.0);
        assert_eq!(*state.table(), AcceptanceTable::new(2.0, 1.0));
        assert!(state.set_coupling(-1.0).is_err());
    }

    #[test]
    fn test_drift() {
        let lattice = Lattice::new_uniform(4, 1).unwrap();
        let mut state = SimulationState::new(lattice, 1.0, 1.0).unwrap();
        assert_eq!(state.energy_drift(), 0.0);
        state.add_energy(3.2);
        assert!((state.energy_drift() - 0.1).abs() < 1e-12);
    }
}
