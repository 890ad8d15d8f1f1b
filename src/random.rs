//! Deterministic three-seed pseudo-random generator.
//!
//! Each seed advances as `seed_i = (m_i * seed_i) % n_i` and a draw is the sum
//! of the three normalized seeds modulo 1. The arithmetic is fixed so that a
//! given seed yields the same sequence on every platform.

use crate::config::DEFAULT_RANDOM_SEED;

const MULTIPLIERS: [u64; 3] = [171, 172, 170];
const MODULI: [u64; 3] = [30269, 30307, 30323];

#[derive(Debug, Clone)]
pub struct RandomUtils {
    seeds: [u64; 3],
    seed: u64,
}

impl Default for RandomUtils {
    fn default() -> Self {
        Self::new(DEFAULT_RANDOM_SEED)
    }
}

impl RandomUtils {
    /// Splits `seed` into three non-zero component seeds.
    pub fn new(seed: u64) -> Self {
        let s1 = seed % (MODULI[0] - 1) + 1;
        let rest = seed / (MODULI[0] - 1);
        let s2 = rest % (MODULI[1] - 1) + 1;
        let s3 = (rest / (MODULI[1] - 1)) % (MODULI[2] - 1) + 1;
        Self::from_state([s1, s2, s3], seed)
    }

    fn from_state(seeds: [u64; 3], seed: u64) -> Self {
        Self { seeds, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        for i in 0..3 {
            self.seeds[i] = (MULTIPLIERS[i] * self.seeds[i]) % MODULI[i];
        }
        (self.seeds[0] as f64 / MODULI[0] as f64
            + self.seeds[1] as f64 / MODULI[1] as f64
            + self.seeds[2] as f64 / MODULI[2] as f64)
            % 1.0
    }

    pub fn next_int31(&mut self) -> i32 {
        (2_147_483_647.0 * self.next_float()) as i32
    }

    /// For `bits < 31` this scales the draw by `bits`, not `2^bits`.
    pub fn next_int_with_bits(&mut self, bits: u32) -> i32 {
        if bits >= 31 {
            self.next_int31()
        } else if bits > 0 {
            (self.next_float() * bits as f64) as i32
        } else {
            0
        }
    }

    /// Uniform integer in `0..bound`; `bound == 0` yields 0.
    pub fn next_bounded(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.next_int_with_bits(31) as usize % bound
    }

    /// Forward swap pass followed by a backward swap pass.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let len = items.len();
        for i in 0..len {
            let j = self.next_bounded(len);
            items.swap(i, j);
        }
        for i in (0..len).rev() {
            let j = self.next_bounded(len);
            items.swap(i, j);
        }
    }
}
