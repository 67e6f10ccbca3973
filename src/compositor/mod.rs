//! Compositor — the melody repository and per-hand playhead state.
//!
//! Loads every `.json` melody in a directory (comments allowed),
//! tracks one playhead per hand, and emits parallel note events for the
//! arranger. Hands of different lengths deliberately desynchronize:
//! each index advances modulo its own hand's length.

pub mod melody;

pub use melody::{Melody, MelodyError, NoteEvent, DEFAULT_INTENSITY};

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One gathered batch of simultaneous hand events within a block.
#[derive(Debug, Clone)]
pub struct BlockEvent {
    /// Beat offset from the start of the block.
    pub time: f64,
    pub notes: Vec<f64>,
    pub durations: Vec<f64>,
    pub intensities: Vec<f64>,
}

#[derive(Debug)]
struct Crossfade {
    target: String,
    remaining: u32,
}

/// The melody repository plus playback state.
pub struct Compositor {
    melodies: HashMap<String, Melody>,
    current: Option<String>,
    hands: Vec<Vec<NoteEvent>>,
    idxs: Vec<usize>,
    scratch_notes: Vec<f64>,
    scratch_durs: Vec<f64>,
    scratch_ints: Vec<f64>,
    crossfade: Option<Crossfade>,
    rng: ChaCha8Rng,
}

impl Compositor {
    /// Scan a directory for `.json` melodies. Malformed files are
    /// skipped with a warning; an unreadable directory is an error.
    pub fn load_dir(dir: &Path, seed: u64) -> io::Result<Self> {
        let mut melodies = HashMap::new();
        let mut names: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect();
        names.sort();

        for path in names {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let src = match fs::read_to_string(&path) {
                Ok(src) => src,
                Err(e) => {
                    log::warn!("failed to read {}: {e}", path.display());
                    continue;
                }
            };
            match Melody::from_source(&name, &src) {
                Ok(melody) => {
                    log::info!(
                        "registered melody '{}' ({} hand(s))",
                        name,
                        melody.hands.len()
                    );
                    melodies.insert(name, melody);
                }
                Err(e) => log::warn!("skipping {}: {e}", path.display()),
            }
        }
        Ok(Self::with_melodies(melodies.into_values().collect(), seed))
    }

    /// Build from already-parsed melodies (tests, embedded material).
    pub fn with_melodies(melodies: Vec<Melody>, seed: u64) -> Self {
        Self {
            melodies: melodies.into_iter().map(|m| (m.name.clone(), m)).collect(),
            current: None,
            hands: Vec::new(),
            idxs: Vec::new(),
            scratch_notes: vec![0.0],
            scratch_durs: vec![1.0],
            scratch_ints: vec![0.0],
            crossfade: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.melodies.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.melodies.is_empty()
    }

    pub fn current_melody(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Begin a fresh run of the named melody: all playheads reset, and
    /// the scratch buffers are sized once so `next_event` only advances
    /// indices afterwards.
    pub fn start(&mut self, name: &str) {
        match self.melodies.get(name) {
            Some(melody) => {
                self.hands = melody.hands.clone();
                self.idxs = vec![0; self.hands.len()];
                self.current = Some(name.to_string());
                let n = self.hands.len().max(1);
                self.scratch_notes = vec![0.0; n];
                self.scratch_durs = vec![1.0; n];
                self.scratch_ints = vec![0.0; n];
            }
            None => log::warn!("unknown melody '{name}'"),
        }
    }

    /// One sample per hand, advancing each hand's playhead modulo its
    /// own length. With nothing started, emits a single rest.
    pub fn next_event(&mut self) -> (&[f64], &[f64], &[f64]) {
        if self.hands.is_empty() {
            self.scratch_notes[0] = 0.0;
            self.scratch_durs[0] = 1.0;
            self.scratch_ints[0] = 0.0;
        } else {
            for (hi, hand) in self.hands.iter().enumerate() {
                let ev = hand[self.idxs[hi]];
                self.scratch_notes[hi] = ev.frequency;
                self.scratch_durs[hi] = ev.duration;
                self.scratch_ints[hi] = ev.intensity;
                self.idxs[hi] = (self.idxs[hi] + 1) % hand.len();
            }
        }
        (&self.scratch_notes, &self.scratch_durs, &self.scratch_ints)
    }

    /// Gather events until the accumulated duration covers `beats`.
    /// The accumulator advances by the mean duration of each batch.
    pub fn next_block_events(&mut self, beats: f64) -> Vec<BlockEvent> {
        self.maybe_exchange();
        let mut events = Vec::new();
        let mut acc = 0.0;
        while acc < beats {
            let (notes, durs, ints) = self.next_event();
            let mean = durs.iter().sum::<f64>() / durs.len() as f64;
            events.push(BlockEvent {
                time: acc,
                notes: notes.to_vec(),
                durations: durs.to_vec(),
                intensities: ints.to_vec(),
            });
            acc += mean.max(1e-6);
        }
        events
    }

    /// The entire first-hand sequence, for analysis lookahead.
    pub fn get_full_sequence(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        match self.hands.first() {
            Some(hand) => (
                hand.iter().map(|e| e.frequency).collect(),
                hand.iter().map(|e| e.duration).collect(),
                hand.iter().map(|e| e.intensity).collect(),
            ),
            None => (Vec::new(), Vec::new(), Vec::new()),
        }
    }

    /// Stored tempo of the current melody, or `default`.
    pub fn get_tempo(&self, default: f64) -> f64 {
        self.current
            .as_ref()
            .and_then(|name| self.melodies.get(name))
            .and_then(|m| m.tempo)
            .unwrap_or(default)
    }

    /// Time signature of the current melody, defaulting to 4/4.
    pub fn get_meter(&self) -> (u32, u32) {
        self.current
            .as_ref()
            .and_then(|name| self.melodies.get(name))
            .and_then(|m| m.meter)
            .unwrap_or((4, 4))
    }

    /// Bernoulli trial used by higher layers for stochastic accents.
    pub fn sprinkle(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Pick a melody at random (used by zone loops on their first block).
    pub fn pick_random(&mut self) -> Option<String> {
        let mut names: Vec<String> = self.melodies.keys().cloned().collect();
        if names.is_empty() {
            return None;
        }
        names.sort();
        let idx = self.rng.gen_range(0..names.len());
        Some(names.swap_remove(idx))
    }

    /// Arm a crossfade to another melody over roughly `blocks` blocks.
    /// Each block the swap fires with probability `1/(remaining+1)` —
    /// non-zero from the very first block — and is forced when the
    /// countdown reaches zero.
    pub fn crossfade_to(&mut self, name: &str, blocks: u32) {
        if !self.melodies.contains_key(name) {
            log::warn!("cannot crossfade to unknown melody '{name}'");
            return;
        }
        self.crossfade = Some(Crossfade {
            target: name.to_string(),
            remaining: blocks,
        });
    }

    pub fn crossfade_pending(&self) -> bool {
        self.crossfade.is_some()
    }

    fn maybe_exchange(&mut self) {
        let Some(fade) = &mut self.crossfade else {
            return;
        };
        let p = 1.0 / (fade.remaining as f64 + 1.0);
        if self.rng.gen_bool(p) {
            let target = fade.target.clone();
            self.crossfade = None;
            self.start(&target);
        } else {
            fade.remaining = fade.remaining.saturating_sub(1);
        }
    }
}
