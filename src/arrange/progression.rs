//! Chord progression synthesis — genre templates with a T/S/D Markov
//! fallback, resolved against the analyzed key.

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::harmonic::Analysis;
use crate::theory::{ChordSymbol, Key, Quality};

/// Supported genre templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    Pop,
    Rock,
    Blues,
    Jazz,
    Classical,
    Funk,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Pop,
        Genre::Rock,
        Genre::Blues,
        Genre::Jazz,
        Genre::Classical,
        Genre::Funk,
    ];

    fn template(&self) -> &'static [&'static str] {
        match self {
            Genre::Pop => &["I", "V", "vi", "IV"],
            Genre::Rock => &["I", "IV", "V"],
            Genre::Blues => &["I", "IV", "I", "V"],
            Genre::Jazz => &["ii", "V", "I"],
            Genre::Classical => &["I", "vi", "ii", "V"],
            Genre::Funk => &["I", "bVII", "IV", "I"],
        }
    }

    pub fn parse(s: &str) -> Option<Genre> {
        match s.to_ascii_lowercase().as_str() {
            "pop" => Some(Genre::Pop),
            "rock" => Some(Genre::Rock),
            "blues" => Some(Genre::Blues),
            "jazz" => Some(Genre::Jazz),
            "classical" => Some(Genre::Classical),
            "funk" => Some(Genre::Funk),
            _ => None,
        }
    }
}

/// Function-chain states for the Markov fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    T,
    S,
    D,
}

impl Func {
    /// Weighted successors: T→{S:3, D:2, T:1}, S→{D:4, T:1}, D→{T:5, S:1}.
    fn successors(&self) -> &'static [Func] {
        match self {
            Func::T => &[Func::S, Func::S, Func::S, Func::D, Func::D, Func::T],
            Func::S => &[Func::D, Func::D, Func::D, Func::D, Func::T],
            Func::D => &[Func::T, Func::T, Func::T, Func::T, Func::T, Func::S],
        }
    }

    /// Roman numerals carrying this function; first entry is canonical.
    fn numerals(&self) -> &'static [&'static str] {
        match self {
            Func::T => &["I", "i", "vi", "VI", "III", "iii"],
            Func::S => &["IV", "ii", "II", "iv"],
            Func::D => &["V", "v", "vii°", "VII"],
        }
    }
}

/// Rule-based chord progression generator. Results are memoized per
/// (key, beats, time signature) so a block's progression is stable
/// within one synth instance.
pub struct ProgressionSynth {
    genre: Option<Genre>,
    temperature: f64,
    rng: ChaCha8Rng,
    cache: HashMap<(Key, u64, Option<(u32, u32)>), Vec<ChordSymbol>>,
}

impl ProgressionSynth {
    pub fn new(genre: Option<Genre>, temperature: f64) -> Self {
        Self::with_seed(genre, temperature, 0)
    }

    pub fn with_seed(genre: Option<Genre>, temperature: f64, seed: u64) -> Self {
        Self {
            genre,
            temperature: temperature.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
            cache: HashMap::new(),
        }
    }

    /// Produce the chord sequence for the next `beats` beats.
    pub fn next(&mut self, analysis: &Analysis, beats: f64) -> Vec<ChordSymbol> {
        let cache_key = (analysis.key, beats.to_bits(), analysis.time_signature);
        if let Some(hit) = self.cache.get(&cache_key) {
            return hit.clone();
        }

        let bar_beats = match analysis.time_signature {
            Some((num, den)) if den > 0 => num as f64 * (4.0 / den as f64),
            _ => 4.0,
        };
        let n_bars = ((beats / bar_beats).round() as usize).max(1);

        let numerals: Vec<&'static str> = match self.genre {
            Some(genre) => {
                let tpl = genre.template();
                tpl.iter().cycle().take(n_bars).copied().collect()
            }
            None => {
                let mut out = Vec::with_capacity(n_bars);
                let mut prev = Func::T;
                for _ in 0..n_bars {
                    let next = *choose(&mut self.rng, prev.successors());
                    let options = next.numerals();
                    // Temperature opens up the numeral choice within the
                    // chosen function; cold always takes the canonical one.
                    let numeral = if self.rng.gen_bool(self.temperature) {
                        *choose(&mut self.rng, options)
                    } else {
                        options[0]
                    };
                    out.push(numeral);
                    prev = next;
                }
                out
            }
        };

        let chords: Vec<ChordSymbol> = numerals
            .iter()
            .map(|rn| resolve_numeral(rn, analysis.key))
            .collect();
        self.cache.insert(cache_key, chords.clone());
        chords
    }
}

fn choose<'a, T>(rng: &mut ChaCha8Rng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

/// Resolve a Roman numeral against a key.
///
/// `bVII` is the flat-seventh: root = (tonic + 10) mod 12, major.
/// Otherwise the degree root comes from the key's scale (the leading
/// tone for `vii°`), and the quality from the numeral's case: upper =
/// major, lower = minor (`°` included), `7` suffix = dominant.
pub fn resolve_numeral(rn: &str, key: Key) -> ChordSymbol {
    if rn == "bVII" {
        return ChordSymbol::new((key.tonic + 10) % 12, Quality::Major);
    }

    let body = rn.trim_end_matches('7');
    let dominant7 = rn.len() != body.len();
    let diminished = body.ends_with('°');
    let numerals = body.trim_end_matches('°');

    let degree = match numerals.to_ascii_uppercase().as_str() {
        "I" => 1,
        "II" => 2,
        "III" => 3,
        "IV" => 4,
        "V" => 5,
        "VI" => 6,
        "VII" => 7,
        other => {
            log::warn!("invalid Roman numeral '{other}', falling back to I");
            1
        }
    };

    // The leading tone, not the natural seventh, for vii°.
    let root = if degree == 7 && diminished {
        (key.tonic + 11) % 12
    } else {
        key.degree_pitch_class(degree)
    };

    let uppercase = numerals.chars().all(|c| c.is_ascii_uppercase());
    let quality = if dominant7 {
        Quality::Dominant7
    } else if uppercase && !diminished {
        Quality::Major
    } else {
        Quality::Minor
    };
    ChordSymbol::new(root, quality)
}
