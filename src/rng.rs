use rand::{Error, RngCore, SeedableRng};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Offset between the seeds of consecutive workers.
pub const WORKER_SEED_STRIDE: u64 = 12345;

/// Replaces an all-zero state, which xorshift can never leave.
const ZERO_STATE_REPLACEMENT: u64 = 0x9E37_79B9_7F4A_7C15;

/// 2^-53, scales a 53 bit integer into [0, 1).
const UNIFORM_SCALE: f64 = 1.0 / 9007199254740992.0;

/// Uniform doubles in [0, 1) with full double resolution.
pub trait UniformSource {
    /// Draw a uniform double in [0, 1) from the top 53 bits of a raw draw.
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore + ?Sized> UniformSource for R {
    fn next_uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIFORM_SCALE
    }
}

/// A 64 bit xorshift generator with shifts (21, 35, 4).
///
/// Deterministic and fast, not cryptographically secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Make a generator with the given state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            ZERO_STATE_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    /// Make the generator for a worker: `base_seed + worker * 12345`.
    pub fn for_worker(base_seed: u64, worker: usize) -> Self {
        Self::new(base_seed.wrapping_add((worker as u64).wrapping_mul(WORKER_SEED_STRIDE)))
    }

    /// Current internal state.
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl RngCore for XorShift64 {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 21;
        self.state ^= self.state >> 35;
        self.state ^= self.state << 4;
        self.state
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.chunks_mut(8).for_each(|chunk| {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        })
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    // The default mixes the seed, we want the state to be exactly the seed.
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

/// One random stream per logical worker, owned by the driver for the whole run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RngArena<R = XorShift64> {
    rngs: Vec<R>,
}

impl RngArena<XorShift64> {
    /// Seed `workers` xorshift streams from a base seed.
    pub fn new(base_seed: u64, workers: usize) -> Self {
        Self {
            rngs: (0..workers)
                .map(|worker| XorShift64::for_worker(base_seed, worker))
                .collect(),
        }
    }
}

impl<R: RngCore> RngArena<R> {
    /// Use an existing set of generators, one per worker.
    pub fn from_rngs(rngs: Vec<R>) -> Self {
        Self { rngs }
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.rngs.len()
    }

    /// True if there are no workers.
    pub fn is_empty(&self) -> bool {
        self.rngs.is_empty()
    }

    /// The generator of a single worker.
    pub fn worker(&mut self, worker: usize) -> &mut R {
        &mut self.rngs[worker]
    }

    /// All generators, indexed by worker.
    pub fn as_mut_slice(&mut self) -> &mut [R] {
        &mut self.rngs
    }
}
