//! Seeded pseudo-random source for virtual-node placement.
//!
//! `Alfg` is an additive lagged Fibonacci generator (lags 607 and 273 over
//! 64-bit words). A host's positions are never stored: they are redrawn from
//! the host's seed whenever the host is removed, so the output stream is a
//! frozen function of the seed. Do not change the seeding, the warm-up table
//! or the output extraction.

use {
    rand_core::{impls, Error as RandError, RngCore, SeedableRng},
    std::fmt,
};

mod warm;

const LEN: usize = 607;
const TAP: usize = 273;
const MASK_63: u64 = (1 << 63) - 1;

const INT32_MAX: i64 = i32::MAX as i64;
const ZERO_SEED: i32 = 89482311;

/// Minimal standard (Park-Miller) step, `x * 48271 mod (2^31 - 1)`, using
/// Schrage's method so nothing overflows an `i32`.
#[inline]
fn seed_step(x: i32) -> i32 {
    const A: i32 = 48271;
    const Q: i32 = 44488;
    const R: i32 = 3399;

    let hi = x / Q;
    let lo = x % Q;
    let x = A * lo - R * hi;
    if x < 0 {
        x + i32::MAX
    } else {
        x
    }
}

#[derive(Clone)]
pub struct Alfg {
    tap: usize,
    feed: usize,
    vec: [u64; LEN],
}

impl Alfg {
    /// Creates a generator from `seed`. Seeds congruent modulo `2^31 - 1`
    /// produce the same stream.
    pub fn new(seed: i64) -> Self {
        let mut seed = seed % INT32_MAX;
        if seed < 0 {
            seed += INT32_MAX;
        }

        // In range after the reduction above.
        let mut x = if seed == 0 { ZERO_SEED } else { seed as i32 };

        for _ in 0..20 {
            x = seed_step(x);
        }

        let mut vec = [0u64; LEN];
        for (slot, warm) in vec.iter_mut().zip(warm::WARM.iter()) {
            x = seed_step(x);
            let mut u = (x as u64) << 40;
            x = seed_step(x);
            u ^= (x as u64) << 20;
            x = seed_step(x);
            u ^= x as u64;
            *slot = u ^ warm;
        }

        Alfg {
            tap: 0,
            feed: LEN - TAP,
            vec,
        }
    }

    /// Returns the next value with the top bit cleared.
    #[inline]
    pub fn next_u63(&mut self) -> u64 {
        self.step() & MASK_63
    }

    #[inline]
    fn step(&mut self) -> u64 {
        self.tap = self.tap.checked_sub(1).unwrap_or(LEN - 1);
        self.feed = self.feed.checked_sub(1).unwrap_or(LEN - 1);

        let x = self.vec[self.feed].wrapping_add(self.vec[self.tap]);
        self.vec[self.feed] = x;
        x
    }
}

impl fmt::Debug for Alfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alfg")
            .field("tap", &self.tap)
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}

impl RngCore for Alfg {
    /// Bits 31..62 of the next 63-bit value.
    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.next_u63() >> 31) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Alfg {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Alfg::new(i64::from_le_bytes(seed))
    }

    /// Reinterprets `state` as a signed seed instead of expanding it.
    fn seed_from_u64(state: u64) -> Self {
        Alfg::new(state as i64)
    }
}
