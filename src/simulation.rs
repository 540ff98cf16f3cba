use crate::error::IsingError;
use crate::lattice::{Color, Lattice};
use crate::observables::{Measurement, SanityCheck};
use crate::rng::{RngArena, XorShift64};
use crate::snapshot::LatticeSnapshot;
use crate::state::{check_coupling, check_temperature, SimulationState};
use crate::sweep::{half_sweep, PartitionExecutor, RayonExecutor};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default coupling constant J.
pub const DEFAULT_COUPLING: f64 = 1.0;
/// Default base seed for the worker generators.
pub const DEFAULT_SEED: u64 = 100;

/// Number of full sweeps covering a single spin step budget: `ceil(steps / sites)`, at least 1.
pub fn sweeps_for_steps(steps: u64, sites: usize) -> u64 {
    let sites = sites.max(1) as u64;
    (steps / sites + u64::from(steps % sites != 0)).max(1)
}

/// Parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Lattice edge length L.
    pub size: usize,
    /// Temperature T.
    pub temperature: f64,
    /// Requested single spin steps.
    pub steps: u64,
    /// Coupling constant J.
    pub coupling: f64,
    /// Base seed, worker `k` is seeded with `seed + 12345 k`.
    pub seed: u64,
    /// Number of workers, `None` uses rayon's current thread count.
    pub workers: Option<usize>,
}

impl SimulationConfig {
    /// A config with the default coupling, seed and worker count.
    pub fn new(size: usize, temperature: f64, steps: u64) -> Self {
        Self {
            size,
            temperature,
            steps,
            coupling: DEFAULT_COUPLING,
            seed: DEFAULT_SEED,
            workers: None,
        }
    }

    /// Set the coupling constant.
    pub fn with_coupling(mut self, coupling: f64) -> Self {
        self.coupling = coupling;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fix the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Check every parameter, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), IsingError> {
        if self.size == 0 {
            return Err(IsingError::InvalidLatticeSize(self.size));
        }
        check_temperature(self.temperature)?;
        check_coupling(self.coupling)?;
        if self.steps == 0 {
            return Err(IsingError::InvalidSteps);
        }
        if self.workers == Some(0) {
            return Err(IsingError::InvalidWorkers);
        }
        Ok(())
    }

    /// Number of full sweeps this config runs.
    pub fn sweeps(&self) -> u64 {
        sweeps_for_steps(self.steps, self.size.saturating_mul(self.size))
    }

    /// Resolved worker count.
    pub fn num_workers(&self) -> usize {
        self.workers.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Measurements at a checkpoint with their sanity check.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Checkpoint {
    /// Total energy, recomputed from the lattice.
    pub energy: f64,
    /// Mean magnetization per spin.
    pub magnetization: f64,
    /// Bounds check on the above.
    pub sanity: SanityCheck,
}

/// Result of [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Full sweeps performed.
    pub sweeps: u64,
    /// Workers used.
    pub workers: usize,
    /// State before the first sweep.
    pub initial_state: Checkpoint,
    /// State after the last sweep.
    pub final_state: Checkpoint,
    /// Energy tracked incrementally during the run.
    pub running_energy: f64,
}

/// Owns the state, the worker generators and the executor, and runs alternating half-sweeps.
#[derive(Debug)]
pub struct Simulation<E: PartitionExecutor = RayonExecutor> {
    config: SimulationConfig,
    state: SimulationState,
    rngs: RngArena<XorShift64>,
    executor: E,
    sweeps_done: u64,
}

impl Simulation<RayonExecutor> {
    /// Build a simulation on its own rayon pool.
    pub fn new(config: SimulationConfig) -> Result<Self, IsingError> {
        config.validate()?;
        let executor = RayonExecutor::new(config.num_workers())?;
        Self::with_executor(config, executor)
    }
}

impl<E: PartitionExecutor> Simulation<E> {
    /// Build a simulation with a random lattice drawn from the first worker's generator.
    pub fn with_executor(config: SimulationConfig, executor: E) -> Result<Self, IsingError> {
        config.validate()?;
        let mut rngs = RngArena::new(config.seed, config.num_workers());
        let lattice = Lattice::new_random(config.size, rngs.worker(0))?;
        Self::assemble(config, lattice, rngs, executor)
    }

    /// Build a simulation starting from a given lattice. No draws are consumed initializing it.
    pub fn with_lattice(
        config: SimulationConfig,
        lattice: Lattice,
        executor: E,
    ) -> Result<Self, IsingError> {
        config.validate()?;
        if lattice.size() != config.size {
            return Err(IsingError::SizeMismatch {
                expected: config.size * config.size,
                found: lattice.num_sites(),
            });
        }
        let rngs = RngArena::new(config.seed, config.num_workers());
        Self::assemble(config, lattice, rngs, executor)
    }

    fn assemble(
        config: SimulationConfig,
        lattice: Lattice,
        rngs: RngArena<XorShift64>,
        executor: E,
    ) -> Result<Self, IsingError> {
        let state = SimulationState::new(lattice, config.coupling, config.temperature)?;
        debug!(
            size = config.size,
            workers = rngs.len(),
            threads = executor.num_workers(),
            "Built simulation"
        );
        if !state.lattice().is_bipartite() && rngs.len() > 1 {
            debug!(
                size = config.size,
                "Odd lattice size, half-sweeps run serially on the first worker's stream"
            );
        }
        Ok(Self {
            config,
            state,
            rngs,
            executor,
            sweeps_done: 0,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// The current lattice.
    pub fn lattice(&self) -> &Lattice {
        self.state.lattice()
    }

    /// Number of workers, one generator each.
    pub fn num_workers(&self) -> usize {
        self.rngs.len()
    }

    /// Full sweeps performed so far.
    pub fn sweeps_done(&self) -> u64 {
        self.sweeps_done
    }

    /// Incrementally tracked energy.
    pub fn running_energy(&self) -> f64 {
        self.state.running_energy()
    }

    /// Change the temperature for subsequent sweeps.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), IsingError> {
        self.state.set_temperature(temperature)?;
        self.config.temperature = temperature;
        Ok(())
    }

    /// Update one color and add its energy change to the running energy.
    pub fn half_sweep(&mut self, color: Color) -> f64 {
        let delta = half_sweep(
            &mut self.state,
            color,
            self.rngs.as_mut_slice(),
            &self.executor,
        );
        self.state.add_energy(delta);
        delta
    }

    /// A color 0 then a color 1 half-sweep.
    pub fn sweep(&mut self) {
        Color::ALL.iter().for_each(|color| {
            self.half_sweep(*color);
        });
        self.sweeps_done += 1;
    }

    /// Perform `t` full sweeps.
    pub fn sweeps(&mut self, t: u64) {
        (0..t).for_each(|_| self.sweep());
    }

    /// Recompute observables and check them.
    pub fn checkpoint(&self) -> Checkpoint {
        let Measurement {
            energy,
            magnetization,
        } = self.state.measure();
        let sanity = SanityCheck::evaluate(
            energy,
            magnetization,
            self.state.coupling(),
            self.lattice().num_sites(),
        );
        Checkpoint {
            energy,
            magnetization,
            sanity,
        }
    }

    /// Run the configured number of sweeps, measuring before and after.
    pub fn run(&mut self) -> RunSummary {
        let sweeps = self.config.sweeps();
        let initial_state = self.checkpoint();
        initial_state.sanity.log_violations("Initial state");
        info!(
            size = self.config.size,
            temperature = self.config.temperature,
            sweeps,
            workers = self.num_workers(),
            "Starting run"
        );

        self.sweeps(sweeps);

        let final_state = self.checkpoint();
        final_state.sanity.log_violations("Final state");
        info!(
            energy = final_state.energy,
            magnetization = final_state.magnetization,
            drift = self.state.energy_drift(),
            "Finished run"
        );
        RunSummary {
            sweeps,
            workers: self.num_workers(),
            initial_state,
            final_state,
            running_energy: self.running_energy(),
        }
    }

    /// Take `sweeps` sweeps and fold a measurement every `sampling_freq` sweeps. Energies come
    /// from the running accumulator.
    pub fn sweeps_measure<F, T>(
        &mut self,
        sweeps: u64,
        init_t: T,
        state_fold: F,
        sampling_freq: Option<u64>,
    ) -> T
    where
        F: Fn(T, Measurement) -> T,
    {
        let sampling_freq = sampling_freq.unwrap_or(1).max(1);
        (1..=sweeps).fold(init_t, |acc, t| {
            self.sweep();
            if t % sampling_freq == 0 {
                let m = Measurement {
                    energy: self.running_energy(),
                    magnetization: self.state.magnetization(),
                };
                state_fold(acc, m)
            } else {
                acc
            }
        })
    }

    /// Take `sweeps` sweeps and collect a measurement every `sampling_freq` sweeps.
    pub fn sweeps_sample(&mut self, sweeps: u64, sampling_freq: Option<u64>) -> Vec<Measurement> {
        let capacity = (sweeps / sampling_freq.unwrap_or(1).max(1)) as usize;
        self.sweeps_measure(
            sweeps,
            Vec::with_capacity(capacity),
            |mut acc, m| {
                acc.push(m);
                acc
            },
            sampling_freq,
        )
    }

    /// A read-only colored snapshot of the current lattice.
    pub fn snapshot(&self) -> LatticeSnapshot {
        LatticeSnapshot::from_lattice(self.lattice())
    }

    /// Consume the simulation and return the final state.
    pub fn into_state(self) -> SimulationState {
        self.state
    }
}
