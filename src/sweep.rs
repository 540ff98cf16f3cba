use crate::acceptance::AcceptanceTable;
use crate::error::IsingError;
use crate::lattice::{Color, Lattice, Spin};
use crate::rng::UniformSource;
use crate::state::SimulationState;
use rand::RngCore;
use rayon::prelude::*;
use std::ops::Range;

/// Runs the per-partition work of a half-sweep and joins before returning.
///
/// Implementations decide where tasks run, the metropolis logic never changes.
pub trait PartitionExecutor {
    /// Number of threads tasks may run on.
    fn num_workers(&self) -> usize;

    /// Apply `f` to every task and return the results in task order.
    fn run_partitions<T, F>(&self, tasks: Vec<T>, f: F) -> Vec<f64>
    where
        T: Send,
        F: Fn(T) -> f64 + Sync + Send;
}

/// Runs every partition on the calling thread, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

impl PartitionExecutor for SerialExecutor {
    fn num_workers(&self) -> usize {
        1
    }

    fn run_partitions<T, F>(&self, tasks: Vec<T>, f: F) -> Vec<f64>
    where
        T: Send,
        F: Fn(T) -> f64 + Sync + Send,
    {
        tasks.into_iter().map(f).collect()
    }
}

/// Runs partitions on a fixed size rayon pool.
#[derive(Debug)]
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    /// Start a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self, IsingError> {
        if workers == 0 {
            return Err(IsingError::InvalidWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ising-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }
}

impl PartitionExecutor for RayonExecutor {
    fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn run_partitions<T, F>(&self, tasks: Vec<T>, f: F) -> Vec<f64>
    where
        T: Send,
        F: Fn(T) -> f64 + Sync + Send,
    {
        self.pool
            .install(|| tasks.into_par_iter().map(f).collect::<Vec<_>>())
    }
}

/// Split `rows` into `workers` contiguous ranges whose lengths differ by at most one. The first
/// `rows % workers` ranges get the extra row. Some ranges are empty if there are more workers
/// than rows.
pub fn static_partition(rows: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return vec![];
    }
    let base = rows / workers;
    let extra = rows % workers;
    let mut start = 0;
    (0..workers)
        .map(|worker| {
            let len = base + usize::from(worker < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// The rows of one color owned by one worker, with that worker's generator.
struct PartitionTask<'a, R> {
    rows: Range<usize>,
    spins: &'a mut [Spin],
    rng: &'a mut R,
}

/// Perform a metropolis update of every site of `color` and return the summed energy change.
///
/// Rows are statically partitioned across `rngs.len()` workers, worker `k` owns the `k`th range
/// and draws only from `rngs[k]`. Workers write only their own rows of `color` and read only
/// sites of the opposite color, so the result is independent of how the executor schedules them.
/// The caller is responsible for adding the returned change to the running energy.
///
/// Odd edge lengths put same-color sites next to each other across the periodic seam. Those
/// lattices are updated serially in row-major order with `rngs[0]`, and the executor is unused.
///
/// `rngs` must hold at least one generator. Debug builds panic on an empty slice, release builds
/// update nothing and return 0.
pub fn half_sweep<R, E>(
    state: &mut SimulationState,
    color: Color,
    rngs: &mut [R],
    executor: &E,
) -> f64
where
    R: RngCore + Send,
    E: PartitionExecutor,
{
    debug_assert!(!rngs.is_empty(), "half_sweep needs at least one generator");
    let table = *state.table();
    let coupling = state.coupling();
    let lattice = state.lattice_mut();
    if !lattice.is_bipartite() {
        return match rngs.first_mut() {
            Some(rng) => update_in_place(lattice, color, rng, &table, coupling),
            None => 0.0,
        };
    }
    let size = lattice.size();
    let half = lattice.half_width();
    let (active, frozen) = lattice.split_for_update(color);

    let mut rest = active;
    let tasks = static_partition(size, rngs.len())
        .into_iter()
        .zip(rngs.iter_mut())
        .map(|(rows, rng)| {
            let (spins, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * half);
            rest = tail;
            PartitionTask { rows, spins, rng }
        })
        .collect::<Vec<_>>();

    let deltas = executor.run_partitions(tasks, |task| {
        update_partition(task, frozen, size, half, color, &table, coupling)
    });
    reduce_energy(&deltas)
}

/// Combine per-worker energy changes. Summed in worker order so a fixed worker count gives a
/// bit-reproducible running energy.
fn reduce_energy(deltas: &[f64]) -> f64 {
    deltas.iter().fold(0.0, |acc, d| acc + d)
}

fn update_partition<R: RngCore>(
    task: PartitionTask<'_, R>,
    frozen: &[Spin],
    size: usize,
    half: usize,
    color: Color,
    table: &AcceptanceTable,
    coupling: f64,
) -> f64 {
    let PartitionTask { rows, spins, rng } = task;
    let mut delta = 0.0;
    for (local_row, row) in rows.enumerate() {
        // Column of slot k in this row is 2k + parity.
        let parity = (row + color.index()) % 2;
        let up = ((row + size - 1) % size) * half;
        let down = ((row + 1) % size) * half;
        let here = row * half;
        let row_spins = &mut spins[local_row * half..(local_row + 1) * half];
        for (slot, spin) in row_spins.iter_mut().enumerate() {
            let col = 2 * slot + parity;
            let left = here + ((col + size - 1) % size) / 2;
            let right = here + ((col + 1) % size) / 2;
            let neighbor_sum = i32::from(frozen[up + slot])
                + i32::from(frozen[down + slot])
                + i32::from(frozen[left])
                + i32::from(frozen[right]);
            let delta_e = 2.0 * coupling * f64::from(*spin) * f64::from(neighbor_sum);
            if table.should_flip(delta_e, neighbor_sum, || rng.next_uniform()) {
                *spin = -*spin;
                delta += delta_e;
            }
        }
    }
    delta
}

/// Neighbors are read as they stand, so a site sees seam neighbors of its own color that were
/// flipped earlier in the same pass.
fn update_in_place<R: RngCore>(
    lattice: &mut Lattice,
    color: Color,
    rng: &mut R,
    table: &AcceptanceTable,
    coupling: f64,
) -> f64 {
    let size = lattice.size();
    let mut delta = 0.0;
    for row in 0..size {
        let first = (row + color.index()) % 2;
        for col in (first..size).step_by(2) {
            let spin = lattice.get(row, col);
            let neighbor_sum = lattice.neighbor_sum(row, col);
            let delta_e = 2.0 * coupling * f64::from(spin) * f64::from(neighbor_sum);
            if table.should_flip(delta_e, neighbor_sum, || rng.next_uniform()) {
                lattice.set(row, col, -spin);
                delta += delta_e;
            }
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observables::total_energy;
    use crate::rng::{RngArena, XorShift64};

    fn make_state(size: usize, temperature: f64, seed: u64) -> SimulationState {
        let mut arena = RngArena::new(seed, 1);
        let lattice = Lattice::new_random(size, arena.worker(0)).unwrap();
        SimulationState::new(lattice, 1.0, temperature).unwrap()
    }

    #[test]
    fn test_static_partition() {
        assert_eq!(static_partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(static_partition(4, 1), vec![0..4]);
        assert_eq!(static_partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn test_half_sweep_touches_one_color() {
        let mut state = make_state(8, 2.0, 11);
        let before = state.lattice().clone();
        let mut arena = RngArena::new(11, 3);
        half_sweep(&mut state, Color::Odd, arena.as_mut_slice(), &SerialExecutor);
        assert_eq!(
            state.lattice().sublattice(Color::Even),
            before.sublattice(Color::Even)
        );
    }

    #[test]
    fn test_delta_matches_recompute() {
        let mut state = make_state(8, 2.269, 5);
        let mut arena = RngArena::new(5, 2);
        for _ in 0..20 {
            for color in Color::ALL {
                let before = total_energy(state.lattice(), 1.0);
                let delta = half_sweep(&mut state, color, arena.as_mut_slice(), &SerialExecutor);
                let after = total_energy(state.lattice(), 1.0);
                assert!((after - before - delta).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_all_up_reference() {
        let lattice = Lattice::new_uniform(4, 1).unwrap();
        let mut state = SimulationState::new(lattice, 1.0, 2.269).unwrap();
        let mut arena = RngArena::new(100, 1);
        let delta = half_sweep(&mut state, Color::Even, arena.as_mut_slice(), &SerialExecutor);
        assert_eq!(delta, 24.0);
        let flipped = state
            .lattice()
            .iter()
            .filter(|(_, _, s)| *s == -1)
            .map(|(r, c, _)| (r, c))
            .collect::<Vec<_>>();
        assert_eq!(flipped, vec![(0, 0), (0, 2), (1, 3)]);
    }

    #[test]
    fn test_rayon_matches_serial() {
        let mut a = make_state(16, 2.5, 77);
        let mut b = a.clone();
        let mut rngs_a = RngArena::new(77, 4);
        let mut rngs_b = rngs_a.clone();
        let pool = RayonExecutor::new(4).unwrap();
        for _ in 0..10 {
            for color in Color::ALL {
                half_sweep(&mut a, color, rngs_a.as_mut_slice(), &SerialExecutor);
                half_sweep(&mut b, color, rngs_b.as_mut_slice(), &pool);
            }
        }
        assert_eq!(a.lattice(), b.lattice());
    }

    #[test]
    fn test_odd_size_delta_matches_recompute() {
        for size in [3, 5, 7] {
            let mut state = make_state(size, 2.269, 9);
            let mut arena = RngArena::new(9, 3);
            for _ in 0..20 {
                for color in Color::ALL {
                    let before = total_energy(state.lattice(), 1.0);
                    let delta =
                        half_sweep(&mut state, color, arena.as_mut_slice(), &SerialExecutor);
                    let after = total_energy(state.lattice(), 1.0);
                    assert!((after - before - delta).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_odd_size_uses_first_stream_only() {
        let mut state = make_state(5, 2.269, 3);
        let mut arena = RngArena::new(3, 3);
        let mut untouched = arena.clone();
        half_sweep(&mut state, Color::Even, arena.as_mut_slice(), &SerialExecutor);
        assert_ne!(arena.worker(0).state(), untouched.worker(0).state());
        assert_eq!(arena.worker(1).state(), untouched.worker(1).state());
        assert_eq!(arena.worker(2).state(), untouched.worker(2).state());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "at least one generator")]
    fn test_half_sweep_without_generators() {
        let mut state = make_state(4, 1e9, 1);
        let mut rngs: Vec<XorShift64> = vec![];
        half_sweep(&mut state, Color::Even, rngs.as_mut_slice(), &SerialExecutor);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            RayonExecutor::new(0),
            Err(IsingError::InvalidWorkers)
        ));
    }
}
