//! Deterministic random number generator for game outcomes.
//!
//! A SHA-256 hash chain expands a 32-byte seed into as many draws as a game
//! needs. Production wagers seed from OS entropy; tests seed explicitly to
//! replay exact outcomes.

use rand::RngCore;
use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct GameRng {
    state: [u8; 32],
    index: usize,
    seed_hex: String,
}

impl GameRng {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            state: seed,
            index: 0,
            seed_hex: hex::encode(seed),
        }
    }

    pub fn from_entropy() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Hex form of the seed, recorded on the wager session so an outcome can
    /// be replayed.
    pub fn seed_hex(&self) -> &str {
        &self.seed_hex
    }

    fn next_byte(&mut self) -> u8 {
        if self.index >= 32 {
            let mut hasher = Sha256::new();
            hasher.update(self.state);
            self.state = hasher.finalize().into();
            self.index = 0;
        }
        let byte = self.state[self.index];
        self.index += 1;
        byte
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut value = 0u32;
        for _ in 0..4 {
            value = (value << 8) | self.next_byte() as u32;
        }
        value
    }

    pub fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    /// Uniform f64 in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in [0, max). Rejection sampling keeps it unbiased.
    pub fn next_bounded(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        let limit = u32::MAX - (u32::MAX % max);
        loop {
            let value = self.next_u32();
            if value < limit {
                return value % max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = GameRng::from_seed([7u8; 32]);
        let mut b = GameRng::from_seed([7u8; 32]);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_entropy_seeds_differ() {
        let mut a = GameRng::from_entropy();
        let mut b = GameRng::from_entropy();
        let seq_a: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
        let seq_b: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_bounded_in_range() {
        let mut rng = GameRng::from_seed([3u8; 32]);
        for _ in 0..1000 {
            assert!(rng.next_bounded(37) < 37);
        }
    }

    #[test]
    fn test_f64_in_unit_interval() {
        let mut rng = GameRng::from_seed([9u8; 32]);
        for _ in 0..1000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }
}
