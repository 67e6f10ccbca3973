//! Noise source and bit crusher. Noise is seeded for determinism.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded white noise in [-1, 1].
#[derive(Debug, Clone)]
pub struct NoiseGen {
    rng: ChaCha8Rng,
}

impl NoiseGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn next(&mut self) -> f64 {
        self.rng.gen_range(-1.0..1.0)
    }
}

/// Bit-depth and sample-rate reduction.
///
/// `bits` quantizes the amplitude; `hold` repeats each input sample
/// `hold` times, emulating a lowered sample rate.
#[derive(Debug, Clone)]
pub struct BitCrusher {
    bits: u32,
    hold: u32,
    counter: u32,
    held: f64,
}

impl BitCrusher {
    pub fn new(bits: u32, hold: u32) -> Self {
        Self {
            bits: bits.clamp(1, 24),
            hold: hold.max(1),
            counter: 0,
            held: 0.0,
        }
    }

    pub fn set_bits(&mut self, bits: u32) {
        self.bits = bits.clamp(1, 24);
    }

    pub fn process(&mut self, x: f64) -> f64 {
        if self.counter == 0 {
            let levels = (1u64 << self.bits) as f64;
            self.held = (x * levels).round() / levels;
        }
        self.counter = (self.counter + 1) % self.hold;
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_bounded() {
        let mut n = NoiseGen::new(42);
        for _ in 0..10_000 {
            let v = n.next();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn noise_deterministic_per_seed() {
        let a: Vec<f64> = {
            let mut n = NoiseGen::new(7);
            (0..100).map(|_| n.next()).collect()
        };
        let b: Vec<f64> = {
            let mut n = NoiseGen::new(7);
            (0..100).map(|_| n.next()).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn noise_seeds_differ() {
        let mut a = NoiseGen::new(1);
        let mut b = NoiseGen::new(2);
        let same = (0..100).all(|_| (a.next() - b.next()).abs() < 1e-12);
        assert!(!same);
    }

    #[test]
    fn crusher_quantizes() {
        let mut c = BitCrusher::new(2, 1);
        // 2 bits → 4 levels: outputs land on multiples of 0.25.
        for x in [0.1, 0.3, 0.61, -0.4, 0.99] {
            let y = c.process(x);
            let nearest = (y * 4.0).round() / 4.0;
            assert!((y - nearest).abs() < 1e-12);
        }
    }

    #[test]
    fn crusher_holds_samples() {
        let mut c = BitCrusher::new(16, 4);
        let first = c.process(0.5);
        for _ in 0..3 {
            assert_eq!(c.process(0.9), first);
        }
        // Fifth sample re-captures.
        let next = c.process(0.9);
        assert!((next - first).abs() > 1e-6);
    }

    #[test]
    fn crusher_hold_of_one_passes_each_sample() {
        let mut c = BitCrusher::new(24, 1);
        let a = c.process(0.25);
        let b = c.process(0.75);
        assert!((a - 0.25).abs() < 1e-3);
        assert!((b - 0.75).abs() < 1e-3);
    }
}
