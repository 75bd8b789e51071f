//! Seeded randomness for workloads and stress runs.
//!
//! Every random choice in a benchmark or a stress test draws from one
//! Xoshiro256** stream. Printing its seed is enough to regenerate the exact
//! operation sequence later.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use cl_core::Key;

/// Reproducible random stream keyed by a 64-bit seed.
///
/// # Example
///
/// ```rust
/// use cl_dst::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// let a = rng.gen_key(100);
/// let b = rng.gen_key(100);
///
/// let mut rng2 = DeterministicRng::new(12345);
/// assert_eq!(rng2.gen_key(100), a);
/// assert_eq!(rng2.gen_key(100), b);
/// ```
pub struct DeterministicRng {
    seed: u64,
    rng: Xoshiro256StarStar,
    calls_count: u64,
}

/// Draw count past which a debug build assumes a runaway loop.
const RUNAWAY_DRAW_LIMIT: u64 = 1_000_000_000;

impl DeterministicRng {
    /// Start a stream from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        debug_assert!(seed != 0, "Seed 0 is reserved");

        Self {
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            calls_count: 0,
        }
    }

    /// The seed this stream was started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws taken since creation or the last `reset`.
    #[must_use]
    pub fn calls_count(&self) -> u64 {
        self.calls_count
    }

    fn tick(&mut self) {
        self.calls_count += 1;
        debug_assert!(
            self.calls_count < RUNAWAY_DRAW_LIMIT,
            "RNG drawn {} times, likely a runaway loop",
            self.calls_count
        );
    }

    /// Draw a value of any type `Standard` can sample.
    pub fn gen<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.tick();
        self.rng.gen()
    }

    /// Draw uniformly from `range`.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.tick();
        self.rng.gen_range(range)
    }

    /// Generate a key uniformly in `1..=max_key`.
    pub fn gen_key(&mut self, max_key: Key) -> Key {
        debug_assert!(max_key >= 1, "Key range must not be empty");
        self.gen_range(1..=max_key)
    }

    /// Generate an index uniformly in `0..len`.
    pub fn gen_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "Cannot pick from an empty range");
        self.gen_range(0..len)
    }

    /// `true` with probability `probability`.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        debug_assert!(
            (0.0..=1.0).contains(&probability),
            "Probability must be in [0.0, 1.0]"
        );
        self.tick();
        self.rng.gen_bool(probability)
    }

    /// Permute `slice` uniformly. Counts as one draw.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        self.tick();
        slice.shuffle(&mut self.rng);
    }

    /// Derive an independent stream whose seed comes from this one.
    ///
    /// Each worker thread of a stress run gets its own fork, so thread
    /// interleaving never changes which keys a thread draws.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        let mut new_seed = self.gen::<u64>();
        if new_seed == 0 {
            new_seed = 1;
        }
        Self::new(new_seed)
    }

    /// Rewind to the start of the stream.
    pub fn reset(&mut self) {
        self.rng = Xoshiro256StarStar::seed_from_u64(self.seed);
        self.calls_count = 0;
    }
}
