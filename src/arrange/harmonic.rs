//! Harmonic analysis — key estimation and per-beat chord labeling.
//!
//! Key estimation correlates a duration-weighted pitch-class histogram
//! against the Krumhansl–Schmuckler profiles. The span is then split
//! into one-beat windows and each window's pitch classes are matched
//! against the 24 triad templates.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::theory::{freq_to_pitch_class, ChordSymbol, Key, Mode, Quality};

/// Krumhansl–Schmuckler major key profile.
const KS_MAJOR: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
/// Krumhansl–Schmuckler minor key profile.
const KS_MINOR: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

const CACHE_CAP: usize = 128;

/// Harmonic role of a chord within its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicFunction {
    Tonic = 0,
    Subdominant = 1,
    Dominant = 2,
}

/// The result of analyzing a melodic span.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub key: Key,
    pub chords: Vec<ChordSymbol>,
    pub functions: Vec<HarmonicFunction>,
    /// Window durations in beats; sums to the analyzed span.
    pub durations: Vec<f64>,
    /// Meter, filled in by the arranger (not derivable from pitches).
    pub time_signature: Option<(u32, u32)>,
}

/// Key, chord and function estimation with a bounded memo cache.
pub struct HarmonicAnalyser {
    cache: HashMap<u64, Analysis>,
    order: VecDeque<u64>,
}

impl HarmonicAnalyser {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Analyze a melody of `(frequency_hz, duration_beats)` pairs.
    /// Frequency 0 is a rest: it advances time but carries no pitch.
    pub fn describe(&mut self, melody: &[(f64, f64)]) -> Analysis {
        let key = Self::cache_key(melody);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let analysis = Self::describe_uncached(melody);
        if self.cache.len() >= CACHE_CAP {
            if let Some(oldest) = self.order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(key, analysis.clone());
        self.order.push_back(key);
        analysis
    }

    fn cache_key(melody: &[(f64, f64)]) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (freq, dur) in melody {
            freq.to_bits().hash(&mut hasher);
            dur.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn describe_uncached(melody: &[(f64, f64)]) -> Analysis {
        // Onset times and pitch classes; rests advance time only.
        let mut events: Vec<(f64, usize)> = Vec::new();
        let mut hist = [0.0f64; 12];
        let mut t = 0.0;
        for &(freq, dur) in melody {
            if freq > 0.0 && dur > 0.0 {
                let pc = freq_to_pitch_class(freq);
                events.push((t, pc));
                hist[pc] += dur;
            }
            t += dur.max(0.0);
        }
        let span = t;

        let key = Self::estimate_key(&hist);

        // Degenerate span: tonic triad over one uniform beat.
        if span <= 0.0 {
            return Analysis {
                key,
                chords: vec![key.tonic_chord()],
                functions: vec![HarmonicFunction::Tonic],
                durations: vec![1.0],
                time_signature: None,
            };
        }

        let total = (span.ceil() as usize).max(1);
        let mut chords = Vec::with_capacity(total);
        let mut durations = Vec::with_capacity(total);
        for b in 0..total {
            let window: Vec<usize> = events
                .iter()
                .filter(|(time, _)| *time >= b as f64 && *time < b as f64 + 1.0)
                .map(|(_, pc)| *pc)
                .collect();
            chords.push(Self::best_triad(&window, key));
            // The final window absorbs the fractional remainder.
            durations.push(if b + 1 == total {
                span - (total as f64 - 1.0)
            } else {
                1.0
            });
        }

        let functions = chords
            .iter()
            .map(|c| Self::function_of(c.root, key.tonic))
            .collect();

        Analysis {
            key,
            chords,
            functions,
            durations,
            time_signature: None,
        }
    }

    fn estimate_key(hist: &[f64; 12]) -> Key {
        if hist.iter().all(|&w| w == 0.0) {
            return Key::C_MAJOR;
        }
        let mut best = (f64::NEG_INFINITY, Key::C_MAJOR);
        for tonic in 0..12 {
            for (mode, profile) in [(Mode::Major, &KS_MAJOR), (Mode::Minor, &KS_MINOR)] {
                let rotated: Vec<f64> = (0..12).map(|i| hist[(tonic + i) % 12]).collect();
                let r = pearson(&rotated, profile);
                if r > best.0 {
                    best = (r, Key::new(tonic, mode));
                }
            }
        }
        best.1
    }

    /// Score the 24 triad templates against a window's pitch classes.
    /// Ties prefer a template containing the tonic; an empty window
    /// resolves to the tonic triad.
    fn best_triad(window: &[usize], key: Key) -> ChordSymbol {
        if window.is_empty() {
            return key.tonic_chord();
        }
        let mut hist = [0u32; 12];
        for &pc in window {
            hist[pc] += 1;
        }
        let mut best_score = 0u32;
        let mut best = key.tonic_chord();
        let mut best_has_tonic = best.tones().contains(&key.tonic);
        for quality in [Quality::Major, Quality::Minor] {
            for root in 0..12 {
                let candidate = ChordSymbol::new(root, quality);
                let tones = candidate.tones();
                let score: u32 = tones.iter().map(|&pc| hist[pc]).sum();
                let has_tonic = tones.contains(&key.tonic);
                let wins = score > best_score
                    || (score == best_score && has_tonic && !best_has_tonic);
                if wins {
                    best_score = score;
                    best = candidate;
                    best_has_tonic = has_tonic;
                }
            }
        }
        best
    }

    fn function_of(root: usize, tonic: usize) -> HarmonicFunction {
        match (root + 12 - tonic) % 12 {
            7 | 11 => HarmonicFunction::Dominant,
            2 | 5 => HarmonicFunction::Subdominant,
            _ => HarmonicFunction::Tonic,
        }
    }
}

impl Default for HarmonicAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}
