//! Arrangement pipeline — analyze → progress → orchestrate → auto-mix.
//!
//! Invoked once per block: melody events pulled from the compositor are
//! analyzed into a key and chord functions, grown into a progression,
//! voiced across instrumental parts, and loudness-normalized. The
//! pipeline is pure — rendering the parts into engine commands is the
//! Maestro's job.

pub mod automix;
pub mod harmonic;
pub mod mixer;
pub mod orchestrator;
pub mod progression;

pub use automix::{AutoMixer, LoudnessMeter, DEFAULT_TARGET_LUFS};
pub use harmonic::{Analysis, HarmonicAnalyser, HarmonicFunction};
pub use mixer::SpectralMixer;
pub use orchestrator::Orchestrator;
pub use progression::{Genre, ProgressionSynth};

use std::collections::HashMap;

use crate::compositor::Compositor;
use crate::pool::WorkerPool;

/// One instrumental part: parallel notes/durations/intensities, plus
/// the mix decisions once the auto-mixer has run.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Orchestrated parts carry MIDI numbers; the raw melody part
    /// carries Hz.
    pub notes: Vec<f64>,
    /// Durations in beats.
    pub durations: Vec<f64>,
    pub intensity: Vec<f64>,
    pub gain_db: Option<f64>,
    pub enable_reverb: bool,
    pub enable_chorus: bool,
}

impl Part {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }
}

/// The per-block arrangement chain.
pub struct ArrangementEngine {
    analyser: HarmonicAnalyser,
    progression: ProgressionSynth,
    orchestrator: Orchestrator,
    mixer: AutoMixer,
}

impl ArrangementEngine {
    pub fn new(genre: Option<Genre>, seed: u64) -> Self {
        Self {
            analyser: HarmonicAnalyser::new(),
            progression: ProgressionSynth::with_seed(genre, 0.5, seed),
            orchestrator: Orchestrator::new(),
            mixer: AutoMixer::new(DEFAULT_TARGET_LUFS),
        }
    }

    /// Run the full chain for one block of `beats` beats. The melody is
    /// pulled from the compositor and injected as its own part.
    pub fn prepare_block(
        &mut self,
        compositor: &mut Compositor,
        beats: f64,
        pool: Option<&WorkerPool>,
    ) -> HashMap<String, Part> {
        let raw = compositor.next_block_events(beats);

        // Flatten all hands for analysis.
        let melody: Vec<(f64, f64)> = raw
            .iter()
            .flat_map(|ev| ev.notes.iter().copied().zip(ev.durations.iter().copied()))
            .collect();
        let mut analysis = self.analyser.describe(&melody);
        analysis.time_signature = Some(compositor.get_meter());

        let chords = self.progression.next(&analysis, beats);
        let chord_dur = beats / chords.len().max(1) as f64;
        let rhythm = vec![chord_dur; chords.len()];

        let mut parts = self.orchestrator.voice(&chords, &rhythm);

        let mut melody_part = Part::new();
        for ev in &raw {
            melody_part.notes.extend_from_slice(&ev.notes);
            melody_part.durations.extend_from_slice(&ev.durations);
            melody_part.intensity.extend_from_slice(&ev.intensities);
        }
        parts.insert("melody".to_string(), melody_part);

        match pool {
            Some(pool) => self.mixer.autoset_pooled(&mut parts, None, pool),
            None => self.mixer.autoset(&mut parts, None),
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::Melody;

    fn compositor() -> Compositor {
        let melody = Melody::from_source(
            "walk",
            r#"{ "tempo": 120, "time_signature": "4/4",
                "hands": [[
                    { "frequency": 261.63, "duration_beats": 1.0 },
                    { "frequency": 329.63, "duration_beats": 1.0 },
                    { "frequency": 392.0,  "duration_beats": 1.0 },
                    { "frequency": 440.0,  "duration_beats": 1.0 }
                ]] }"#,
        )
        .unwrap();
        let mut c = Compositor::with_melodies(vec![melody], 42);
        c.start("walk");
        c
    }

    #[test]
    fn prepare_block_produces_all_parts() {
        let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
        let mut comp = compositor();
        let parts = engine.prepare_block(&mut comp, 8.0, None);
        for role in ["bass", "piano", "melody"] {
            assert!(parts.contains_key(role), "missing {role}");
            assert!(!parts[role].is_empty());
        }
    }

    #[test]
    fn orchestrated_durations_sum_to_block() {
        let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
        let mut comp = compositor();
        for beats in [4.0, 8.0, 16.0] {
            let parts = engine.prepare_block(&mut comp, beats, None);
            for role in ["bass", "piano"] {
                let total = parts[role].total_duration();
                assert!(
                    (total - beats).abs() < 1e-6,
                    "{role} at {beats} beats sums to {total}"
                );
            }
        }
    }

    #[test]
    fn every_part_is_mixed() {
        let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
        let mut comp = compositor();
        let parts = engine.prepare_block(&mut comp, 8.0, None);
        for (role, part) in &parts {
            assert!(part.gain_db.is_some(), "{role} missing gain");
            assert_eq!(part.notes.len(), part.durations.len());
            assert_eq!(part.notes.len(), part.intensity.len());
        }
    }

    #[test]
    fn melody_part_covers_block() {
        let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
        let mut comp = compositor();
        let parts = engine.prepare_block(&mut comp, 8.0, None);
        assert!(parts["melody"].total_duration() >= 8.0);
    }

    #[test]
    fn pooled_pipeline_matches_part_shape() {
        let pool = WorkerPool::new(2);
        let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
        let mut comp = compositor();
        let parts = engine.prepare_block(&mut comp, 8.0, Some(&pool));
        for role in ["bass", "piano", "melody"] {
            assert!(parts[role].gain_db.is_some());
        }
    }
}
