//! Seed derivation for independent random streams.
//!
//! Every chunk of events draws from its own generator, seeded from a base
//! seed and the chunk index. The output of a run therefore depends only on
//! the base seed and the chunk size, never on thread scheduling.

use std::time::{SystemTime, UNIX_EPOCH};

/// SplitMix64 finaliser.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive the seed of stream `stream` from `base`.
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    splitmix64(base ^ splitmix64(stream))
}

/// A base seed taken from the wall clock, for runs without a configured seed.
pub fn time_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    splitmix64(nanos ^ u64::from(std::process::id()))
}
