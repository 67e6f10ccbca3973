//! Master chain — eight-band parametric EQ and the output limiter.

use crate::dsp::Biquad;

/// The EQ band centers in Hz.
pub const EQ_BANDS: [f64; 8] = [125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0];

/// Eight peaking filters at fixed centers. Gains arrive as linear
/// multipliers from the spectral mixer and are applied in dB.
pub struct MasterEq {
    bands: Vec<(f64, Biquad)>,
}

impl MasterEq {
    pub fn new(sample_rate: f64) -> Self {
        let bands = EQ_BANDS
            .iter()
            .map(|&hz| (hz, Biquad::peaking(sample_rate, hz, 1.0, 0.0)))
            .collect();
        Self { bands }
    }

    /// Set the gain of the band nearest `band_hz`. `gain` is linear
    /// (1.0 = unity); values at or below zero are ignored.
    pub fn set_gain(&mut self, band_hz: f64, gain: f64) {
        if gain <= 0.0 {
            return;
        }
        let nearest = self
            .bands
            .iter_mut()
            .min_by(|a, b| {
                (a.0 - band_hz)
                    .abs()
                    .partial_cmp(&(b.0 - band_hz).abs())
                    .expect("band centers are finite")
            })
            .expect("band table is non-empty");
        nearest.1.set_gain_db(20.0 * gain.log10());
    }

    /// Filter an interleaved stereo block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for (_, filter) in &mut self.bands {
            for sample in block.iter_mut() {
                *sample = filter.process(*sample as f64) as f32;
            }
        }
    }
}

/// Hard limiter clamping samples to `[-ceiling, ceiling]`.
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    pub fn new(ceiling: f32) -> Self {
        debug_assert!(ceiling > 0.0 && ceiling <= 1.0);
        Self { ceiling }
    }

    #[inline]
    pub fn process_block(&self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = sample.clamp(-self.ceiling, self.ceiling);
        }
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self { ceiling: 0.95 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_clamps() {
        let limiter = Limiter::default();
        let mut block = vec![2.0f32, -2.0, 0.5, -0.5];
        limiter.process_block(&mut block);
        assert_eq!(block, vec![0.95, -0.95, 0.5, -0.5]);
    }

    #[test]
    fn eq_unity_is_transparent() {
        let mut eq = MasterEq::new(44100.0);
        let mut block: Vec<f32> = (0..1024).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let original = block.clone();
        eq.process_block(&mut block);
        for (a, b) in block.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn eq_cut_reduces_band_energy() {
        let sr = 44100.0;
        let mut eq = MasterEq::new(sr);
        eq.set_gain(1000.0, 0.5); // -6 dB at 1 kHz

        // Stereo 1 kHz tone.
        let mut block: Vec<f32> = (0..8192)
            .flat_map(|i| {
                let s = (i as f64 * std::f64::consts::TAU * 1000.0 / sr).sin() as f32 * 0.5;
                [s, s]
            })
            .collect();
        let before: f32 = block.iter().map(|s| s * s).sum();
        eq.process_block(&mut block);
        let after: f32 = block.iter().map(|s| s * s).sum();
        assert!(after < before * 0.8, "before={before} after={after}");
    }

    #[test]
    fn eq_snaps_to_nearest_band() {
        let mut eq = MasterEq::new(44100.0);
        // 1100 Hz is nearest the 1 kHz band; must not panic or misindex.
        eq.set_gain(1100.0, 0.7);
        eq.set_gain(30.0, 0.7); // below the lowest band
        eq.set_gain(30000.0, 0.7); // above the highest band
    }

    #[test]
    fn eq_ignores_non_positive_gain() {
        let mut eq = MasterEq::new(44100.0);
        eq.set_gain(1000.0, 0.0);
        eq.set_gain(1000.0, -1.0);
        let mut block = vec![0.5f32; 512];
        eq.process_block(&mut block);
        assert!(block.iter().all(|s| s.is_finite()));
    }
}
