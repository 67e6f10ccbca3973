//! Auto-mixing — loudness-normalized gains and effect heuristics.
//!
//! Each part is rendered as a quick sine stub at 48 kHz, measured with
//! an ITU-R BS.1770 integrated-loudness meter, and assigned
//! `gain_db = target − measured`. Magnitude spectra are computed with
//! rustfft; frequency-bin tables are cached by sample count so parts of
//! identical length reuse their allocation.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::Part;
use crate::dsp::Biquad;
use crate::pool::WorkerPool;
use crate::theory::{note_to_freq, note_to_midi};

/// Default mixing target in LUFS.
pub const DEFAULT_TARGET_LUFS: f64 = -14.0;
/// Stub rendering rate; the BS.1770 filter constants assume it.
pub const MIX_SAMPLE_RATE: u32 = 48000;

/// Integrated loudness per ITU-R BS.1770-4 (mono, 48 kHz).
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    sample_rate: f64,
}

impl LoudnessMeter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
        }
    }

    /// Integrated loudness in LUFS. Returns `-inf` for silence.
    pub fn integrated(&self, samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NEG_INFINITY;
        }

        // K-weighting: shelf then RLB high-pass.
        let mut shelf = Biquad::k_weight_shelf_48k();
        let mut rlb = Biquad::k_weight_highpass_48k();
        let weighted: Vec<f64> = samples
            .iter()
            .map(|&x| rlb.process(shelf.process(x)))
            .collect();

        // 400 ms gating blocks with 75% overlap.
        let block = (0.4 * self.sample_rate) as usize;
        let hop = block / 4;
        let mut block_powers = Vec::new();
        if weighted.len() < block {
            let p = mean_square(&weighted);
            if p > 0.0 {
                block_powers.push(p);
            }
        } else {
            let mut start = 0;
            while start + block <= weighted.len() {
                let p = mean_square(&weighted[start..start + block]);
                if p > 0.0 {
                    block_powers.push(p);
                }
                start += hop;
            }
        }

        // Absolute gate at -70 LUFS.
        let abs_gated: Vec<f64> = block_powers
            .iter()
            .copied()
            .filter(|&p| loudness_of(p) > -70.0)
            .collect();
        if abs_gated.is_empty() {
            return f64::NEG_INFINITY;
        }

        // Relative gate 10 LU below the mean of the absolute-gated set.
        let mean: f64 = abs_gated.iter().sum::<f64>() / abs_gated.len() as f64;
        let threshold = loudness_of(mean) - 10.0;
        let rel_gated: Vec<f64> = abs_gated
            .into_iter()
            .filter(|&p| loudness_of(p) > threshold)
            .collect();
        if rel_gated.is_empty() {
            return f64::NEG_INFINITY;
        }

        let mean: f64 = rel_gated.iter().sum::<f64>() / rel_gated.len() as f64;
        loudness_of(mean)
    }
}

fn loudness_of(power: f64) -> f64 {
    -0.691 + 10.0 * power.log10()
}

fn mean_square(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64
}

/// FFT magnitude spectra with a bin-frequency cache keyed by length.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
    bins: HashMap<usize, Arc<Vec<f64>>>,
    sample_rate: f64,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            planner: FftPlanner::new(),
            bins: HashMap::new(),
            sample_rate,
        }
    }

    /// Frequencies of the real-spectrum bins for an N-point transform.
    /// Cached so repeated lengths reuse the allocation.
    pub fn bin_freqs(&mut self, n: usize) -> Arc<Vec<f64>> {
        let sample_rate = self.sample_rate;
        Arc::clone(self.bins.entry(n).or_insert_with(|| {
            Arc::new(
                (0..=n / 2)
                    .map(|i| i as f64 * sample_rate / n as f64)
                    .collect(),
            )
        }))
    }

    /// Magnitude spectrum (first half, DC through Nyquist).
    pub fn magnitude(&mut self, samples: &[f64]) -> Vec<f64> {
        if samples.is_empty() {
            return Vec::new();
        }
        let fft = self.planner.plan_fft_forward(samples.len());
        let mut buf: Vec<Complex<f64>> =
            samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buf);
        buf[..=samples.len() / 2].iter().map(|c| c.norm()).collect()
    }

    pub fn cached_lengths(&self) -> usize {
        self.bins.len()
    }
}

/// Batch loudness EQ for entire blocks.
pub struct AutoMixer {
    target: f64,
    meter: LoudnessMeter,
    analyzer: SpectrumAnalyzer,
    spectra: HashMap<String, Vec<f64>>,
}

impl AutoMixer {
    pub fn new(target_lufs: f64) -> Self {
        Self {
            target: target_lufs,
            meter: LoudnessMeter::new(MIX_SAMPLE_RATE),
            analyzer: SpectrumAnalyzer::new(MIX_SAMPLE_RATE as f64),
            spectra: HashMap::new(),
        }
    }

    /// Measure every part and fill in `gain_db` plus the effect flags.
    pub fn autoset(&mut self, parts: &mut HashMap<String, Part>, target: Option<f64>) {
        let tgt = target.unwrap_or(self.target);
        for (name, part) in parts.iter_mut() {
            let stub = sine_stub(&part.notes, &part.durations, MIX_SAMPLE_RATE);
            let measured = self.meter.integrated(&stub);
            self.finish_part(name, part, &stub, measured, tgt);
        }
    }

    /// As [`autoset`](Self::autoset), with the loudness measurement
    /// fanned out over the worker pool.
    pub fn autoset_pooled(
        &mut self,
        parts: &mut HashMap<String, Part>,
        target: Option<f64>,
        pool: &WorkerPool,
    ) {
        let tgt = target.unwrap_or(self.target);
        let (tx, rx) = mpsc::channel();
        let mut pending = 0usize;
        for (name, part) in parts.iter() {
            let tx = tx.clone();
            let name = name.clone();
            let notes = part.notes.clone();
            let durations = part.durations.clone();
            let meter = self.meter.clone();
            pending += 1;
            pool.execute(move || {
                let stub = sine_stub(&notes, &durations, MIX_SAMPLE_RATE);
                let measured = meter.integrated(&stub);
                let _ = tx.send((name, stub, measured));
            });
        }
        drop(tx);
        for _ in 0..pending {
            let Ok((name, stub, measured)) = rx.recv() else {
                break;
            };
            if let Some(part) = parts.get_mut(&name) {
                self.finish_part(&name, part, &stub, measured, tgt);
            }
        }
    }

    fn finish_part(&mut self, name: &str, part: &mut Part, stub: &[f64], measured: f64, tgt: f64) {
        part.gain_db = Some(if measured.is_finite() {
            tgt - measured
        } else {
            0.0
        });
        if !stub.is_empty() {
            // Cache the bin table, then keep the spectrum for the EQ side.
            let _ = self.analyzer.bin_freqs(stub.len());
            let spectrum = self.analyzer.magnitude(stub);
            self.spectra.insert(name.to_string(), spectrum);
        }
        let mean_midi = if part.notes.is_empty() {
            0.0
        } else {
            part.notes.iter().map(|&n| note_to_midi(n)).sum::<f64>() / part.notes.len() as f64
        };
        part.enable_reverb = mean_midi > 60.0;
        part.enable_chorus = part.notes.len() > 6;
    }

    /// The most recent magnitude spectrum measured for a part.
    pub fn spectrum(&self, part: &str) -> Option<&[f64]> {
        self.spectra.get(part).map(Vec::as_slice)
    }

    pub fn cached_bin_lengths(&self) -> usize {
        self.analyzer.cached_lengths()
    }
}

/// Concatenated sine tones for level analysis, one per note. Rests
/// (frequency 0) render as silence. Durations are taken in seconds,
/// matching the measurement stub's role as a quick level probe.
pub fn sine_stub(notes: &[f64], durations: &[f64], sample_rate: u32) -> Vec<f64> {
    let sr = sample_rate as f64;
    let total: usize = durations
        .iter()
        .map(|&d| (sr * d.max(0.0)) as usize)
        .sum();
    let mut out = Vec::with_capacity(total);
    for (&note, &dur) in notes.iter().zip(durations.iter()) {
        let n = (sr * dur.max(0.0)) as usize;
        if note <= 0.0 {
            out.extend(std::iter::repeat(0.0).take(n));
            continue;
        }
        let freq = note_to_freq(note);
        for i in 0..n {
            out.push((std::f64::consts::TAU * freq * i as f64 / sr).sin());
        }
    }
    out
}
