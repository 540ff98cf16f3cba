extern crate checkerboard_ising;
extern crate rand;
use checkerboard_ising::*;
use itertools::iproduct;
use rand::prelude::SmallRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_lattice(size: usize, seed: u64) -> Lattice {
    let mut rng = SmallRng::seed_from_u64(seed);
    let spins = (0..size * size)
        .map(|_| if rng.gen_bool(0.5) { 1 } else { -1 })
        .collect::<Vec<Spin>>();
    Lattice::from_spins(size, &spins).unwrap()
}

fn make_state(size: usize, temperature: f64, seed: u64) -> SimulationState {
    SimulationState::new(random_lattice(size, seed), 1.0, temperature).unwrap()
}

#[test]
fn checkerboard_coloring() {
    for size in [2, 4, 10] {
        let lattice = Lattice::new_uniform(size, 1).unwrap();
        for (row, col) in iproduct!(0..size, 0..size) {
            let color = lattice.color(row, col);
            for (r, c) in lattice.neighbors(row, col).iter() {
                assert_eq!(lattice.color(*r, *c).index(), 1 - color.index());
            }
        }
    }
}

#[test]
fn energy_and_magnetization_bounds() {
    for seed in 0..64 {
        let size = 2 * (1 + seed as usize % 6);
        let lattice = random_lattice(size, seed);
        let e = total_energy(&lattice, 1.0) / lattice.num_sites() as f64;
        let m = mean_magnetization(&lattice);
        assert!((-2.0..=2.0).contains(&e), "e = {}", e);
        assert!(m.abs() <= 1.0);
    }
}

#[test]
fn running_energy_matches_recompute() {
    for (size, workers) in iproduct!([20, 21], [1, 2, 3, 5]) {
        let mut state = make_state(size, 2.269, 1234);
        let mut rngs = RngArena::new(99, workers);
        let pool = RayonExecutor::new(workers).unwrap();
        let mut running = state.running_energy();
        for _ in 0..50 {
            for color in Color::ALL {
                running += half_sweep(&mut state, color, rngs.as_mut_slice(), &pool);
            }
        }
        let exact = total_energy(state.lattice(), 1.0);
        assert!((running - exact).abs() <= 1e-6 * exact.abs().max(1.0));
    }
}

#[test]
fn fixed_worker_count_is_deterministic() {
    let run = || {
        let config = SimulationConfig::new(32, 2.269, 32 * 32 * 20)
            .with_seed(4321)
            .with_workers(4);
        let mut sim = Simulation::new(config).unwrap();
        let summary = sim.run();
        (sim.lattice().to_row_major(), summary.running_energy)
    };
    let (lattice_a, energy_a) = run();
    let (lattice_b, energy_b) = run();
    assert_eq!(lattice_a, lattice_b);
    assert_eq!(energy_a.to_bits(), energy_b.to_bits());
}

#[test]
fn executor_does_not_change_trajectory() {
    let config = SimulationConfig::new(16, 2.0, 16 * 16 * 10)
        .with_seed(8)
        .with_workers(3);
    let mut serial = Simulation::with_executor(config, SerialExecutor).unwrap();
    let mut pooled = Simulation::new(config).unwrap();
    serial.run();
    pooled.run();
    assert_eq!(serial.lattice(), pooled.lattice());
}

#[test]
fn odd_size_ignores_worker_count() {
    let run = |workers| {
        let config = SimulationConfig::new(15, 2.0, 15 * 15 * 10)
            .with_seed(8)
            .with_workers(workers);
        let mut sim = Simulation::new(config).unwrap();
        let summary = sim.run();
        assert!(summary.final_state.sanity.is_ok());
        (sim.lattice().clone(), summary.running_energy)
    };
    let (lattice_one, energy_one) = run(1);
    let (lattice_four, energy_four) = run(4);
    assert_eq!(lattice_one, lattice_four);
    assert_eq!(energy_one.to_bits(), energy_four.to_bits());
}

#[test]
fn low_temperature_energy_never_increases() {
    let mut state = make_state(16, 1e-3, 42);
    let mut rngs = RngArena::new(42, 2);
    for _ in 0..30 {
        for color in Color::ALL {
            let delta = half_sweep(&mut state, color, rngs.as_mut_slice(), &SerialExecutor);
            assert!(delta <= 0.0);
        }
    }
}

#[test]
fn high_temperature_has_no_drift() {
    let size = 16;
    let sweeps = 20;
    let seeds = 64;
    let mut mean_change = 0.0;
    for seed in 0..seeds {
        let config = SimulationConfig::new(size, 50.0, 1)
            .with_seed(1 + seed * 7919)
            .with_workers(2);
        let mut sim = Simulation::with_executor(config, SerialExecutor).unwrap();
        let start = sim.state().magnetization();
        let trajectory = std::iter::once(start)
            .chain(
                sim.sweeps_sample(sweeps, Some(1))
                    .into_iter()
                    .map(|m| m.magnetization),
            )
            .collect::<Vec<_>>();
        assert_eq!(trajectory.len(), sweeps as usize + 1);

        let changes = trajectory
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect::<Vec<_>>();
        // The lattice keeps moving.
        let mean_step = changes.iter().map(|d| d.abs()).sum::<f64>() / sweeps as f64;
        assert!(mean_step > 0.01);
        mean_change += changes.iter().sum::<f64>() / sweeps as f64;
    }
    assert!((mean_change / seeds as f64).abs() < 0.005);
}

#[test]
fn sweep_is_generic_over_rng() {
    let mut state = make_state(12, 2.5, 5);
    let mut rngs = RngArena::from_rngs((0..3).map(ChaCha8Rng::seed_from_u64).collect());
    let mut running = state.running_energy();
    for _ in 0..20 {
        for color in Color::ALL {
            running += half_sweep(&mut state, color, rngs.as_mut_slice(), &SerialExecutor);
        }
    }
    assert!((running - state.recompute_energy()).abs() < 1e-9);
}

#[test]
fn more_workers_than_rows() {
    let mut state = make_state(4, 2.0, 3);
    let mut rngs = RngArena::new(3, 9);
    let mut running = state.running_energy();
    for color in Color::ALL {
        running += half_sweep(&mut state, color, rngs.as_mut_slice(), &SerialExecutor);
    }
    assert_eq!(running, state.recompute_energy());
}
