//! Deterministic hashing for gate decisions
//!
//! Replay depends on gate outcomes being a pure function of the recorded
//! seed, never on a live RNG or the randomized `DefaultHasher`.

use crate::core::types::Turn;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a 64-bit hash over a byte slice
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut state = FNV_OFFSET_BASIS;
    for &byte in bytes {
        state ^= byte as u64;
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

/// Hash of a (seed, turn, identifier) gate key.
///
/// Used by the militia emergence gate as a deterministic pseudo-coin: the
/// same inputs always produce the same value across runs and platforms.
pub fn gate_hash(seed: u64, turn: Turn, id: &str) -> u64 {
    fnv1a(format!("{seed}_{turn}_{id}").as_bytes())
}
