//! Seed hashing and the seeded pseudo-random generator.
//!
//! Every piece of world content derives its randomness from a composite text
//! key such as `"{seed}:{chunk_x}:{chunk_y}"` hashed with [`hash32`]. Nothing
//! here touches process-global state, so a given key produces the same value
//! in every process and in every call order.

use tilecraft_common::WorldSeed;

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET: u32 = 0x811C_9DC5;

/// FNV-1a 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Hashes text with FNV-1a followed by the murmur3 finalizer.
///
/// Plain FNV-1a leaves keys that differ only in their last byte close
/// together; the finalizer spreads them across the whole range, which matters
/// because callers reduce the hash modulo small counts.
#[must_use]
pub fn hash32(text: &str) -> u32 {
    fmix32(hash_bytes(text.as_bytes()))
}

/// Raw FNV-1a over bytes (no finalizer).
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Murmur3 32-bit finalizer.
#[must_use]
pub const fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^= h >> 16;
    h
}

/// Seed of one chunk: `hash32("{world_seed}:{chunk_x}:{chunk_y}")`.
#[must_use]
pub fn chunk_seed(world_seed: &WorldSeed, chunk_x: i32, chunk_y: i32) -> u32 {
    hash32(&format!("{world_seed}:{chunk_x}:{chunk_y}"))
}

/// Counter-based deterministic generator (mulberry32).
///
/// The same seed always yields the same sequence.
#[derive(Debug, Clone)]
pub struct SeededRng {
    /// Generator state (advanced by a fixed increment per draw)
    state: u32,
}

impl SeededRng {
    /// Creates a generator from a 32-bit seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Creates a generator seeded by hashing a text key.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self::new(hash32(key))
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Uniform integer in `[0, n)`. Returns 0 when `n` is 0.
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        (self.next_f64() * f64::from(n)) as u32
    }

    /// Returns true with probability `1 / one_in`. Never true for 0.
    pub fn one_in(&mut self, one_in: u32) -> bool {
        one_in != 0 && self.next_f64() < 1.0 / f64::from(one_in)
    }
}
