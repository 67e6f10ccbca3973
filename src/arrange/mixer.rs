//! Spectral mixer — real-time spectrum analysis driving a parametric EQ.
//!
//! Rendered frames are Hann-windowed, transformed, and averaged over a
//! short rolling history; each EQ band's gain follows the inverse of
//! its averaged magnitude, one-pole smoothed, clamped to [0.5, 1.0].

use std::collections::VecDeque;

use super::automix::SpectrumAnalyzer;
use crate::engine::EQ_BANDS;

const HISTORY: usize = 4;
const SMOOTH_OLD: f64 = 0.8;
const SMOOTH_NEW: f64 = 0.2;

pub struct SpectralMixer {
    analyzer: SpectrumAnalyzer,
    history: VecDeque<Vec<f64>>,
    gains: Vec<(f64, f64)>,
    sample_rate: f64,
}

impl SpectralMixer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(sample_rate),
            history: VecDeque::with_capacity(HISTORY),
            gains: EQ_BANDS.iter().map(|&b| (b, 1.0)).collect(),
            sample_rate,
        }
    }

    /// Analyze one rendered block (interleaved stereo) and return the
    /// updated `(band_hz, gain)` pairs.
    pub fn analyze(&mut self, block: &[f32]) -> Vec<(f64, f64)> {
        if block.len() < 4 {
            return self.gains.clone();
        }
        // Downmix and window.
        let n = block.len() / 2;
        let frame: Vec<f64> = (0..n)
            .map(|i| {
                let mono = (block[2 * i] as f64 + block[2 * i + 1] as f64) * 0.5;
                mono * hann(i, n)
            })
            .collect();

        let spectrum = self.analyzer.magnitude(&frame);
        if self.history.len() == HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(spectrum);

        // Average over history (all entries share the frame length in
        // steady state; guard against a mid-stream size change).
        let len = self.history.back().map(Vec::len).unwrap_or(0);
        let matching: Vec<&Vec<f64>> =
            self.history.iter().filter(|s| s.len() == len).collect();
        let avg: Vec<f64> = (0..len)
            .map(|i| matching.iter().map(|s| s[i]).sum::<f64>() / matching.len() as f64)
            .collect();

        let max = avg.iter().cloned().fold(f64::MIN, f64::max);
        if max <= 0.0 {
            return self.gains.clone();
        }

        for (band, gain) in &mut self.gains {
            // Nearest bin to the band center.
            let bin = (*band * n as f64 / self.sample_rate).round() as usize;
            let magnitude = avg.get(bin.min(len.saturating_sub(1))).copied().unwrap_or(0.0);
            let target = (1.0 - (magnitude / max) * 0.5).clamp(0.5, 1.0);
            *gain = SMOOTH_OLD * *gain + SMOOTH_NEW * target;
        }
        self.gains.clone()
    }

    pub fn gains(&self) -> &[(f64, f64)] {
        &self.gains
    }
}

fn hann(i: usize, n: usize) -> f64 {
    let x = std::f64::consts::PI * i as f64 / n as f64;
    x.sin() * x.sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_tone(freq: f64, sample_rate: f64, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s =
                    (std::f64::consts::TAU * freq * i as f64 / sample_rate).sin() as f32 * 0.5;
                [s, s]
            })
            .collect()
    }

    #[test]
    fn starts_at_unity() {
        let mixer = SpectralMixer::new(48000.0);
        assert!(mixer.gains().iter().all(|&(_, g)| (g - 1.0).abs() < 1e-12));
    }

    #[test]
    fn loud_band_gets_cut() {
        let mut mixer = SpectralMixer::new(48000.0);
        let block = stereo_tone(1000.0, 48000.0, 4096);
        let mut gains = Vec::new();
        for _ in 0..20 {
            gains = mixer.analyze(&block);
        }
        let g_1k = gains
            .iter()
            .find(|(b, _)| (*b - 1000.0).abs() < 1.0)
            .unwrap()
            .1;
        let g_8k = gains
            .iter()
            .find(|(b, _)| (*b - 8000.0).abs() < 1.0)
            .unwrap()
            .1;
        assert!(g_1k < g_8k, "hot band {g_1k} should be cut below {g_8k}");
        assert!(g_1k >= 0.5 - 1e-9);
    }

    #[test]
    fn gains_stay_in_range() {
        let mut mixer = SpectralMixer::new(48000.0);
        for i in 0..30 {
            let freq = 200.0 + 300.0 * i as f64;
            let gains = mixer.analyze(&stereo_tone(freq, 48000.0, 2048));
            for (_, g) in gains {
                assert!((0.5..=1.0 + 1e-9).contains(&g), "gain {g} out of range");
            }
        }
    }

    #[test]
    fn smoothing_is_gradual() {
        let mut mixer = SpectralMixer::new(48000.0);
        let before = mixer.gains().to_vec();
        let after = mixer.analyze(&stereo_tone(1000.0, 48000.0, 4096));
        // One pole at 0.8/0.2: a single frame moves at most 20% of the way.
        for ((_, a), (_, b)) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() <= 0.2 * 0.5 + 1e-9);
        }
    }

    #[test]
    fn silence_leaves_gains_unchanged() {
        let mut mixer = SpectralMixer::new(48000.0);
        let silent = vec![0.0f32; 2048];
        let before = mixer.gains().to_vec();
        let after = mixer.analyze(&silent);
        assert_eq!(before, after);
    }

    #[test]
    fn tiny_blocks_are_ignored() {
        let mut mixer = SpectralMixer::new(48000.0);
        let gains = mixer.analyze(&[0.1, 0.1]);
        assert_eq!(gains.len(), EQ_BANDS.len());
    }
}
