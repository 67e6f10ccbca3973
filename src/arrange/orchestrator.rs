//! Orchestration — voices a chord sequence across instrumental parts.
//!
//! The chord root becomes the bass line; all chord tones spread across
//! the piano register, splitting each chord's duration evenly. Pitches
//! are folded by octaves until they land in the role's register.

use std::collections::HashMap;

use super::Part;
use crate::theory::ChordSymbol;

/// Bass register, MIDI E1–C3.
pub const BASS_REGISTER: (i64, i64) = (28, 48);
/// Piano register, MIDI D3–C7.
pub const PIANO_REGISTER: (i64, i64) = (50, 96);

const BASS_INTENSITY: f64 = 0.9;
const PIANO_INTENSITY: f64 = 0.7;

pub struct Orchestrator;

impl Orchestrator {
    pub fn new() -> Self {
        Self
    }

    /// Voice the chords over the given rhythm (one duration per chord).
    /// Returns parts keyed by role; notes are MIDI numbers.
    pub fn voice(&self, chords: &[ChordSymbol], rhythm: &[f64]) -> HashMap<String, Part> {
        let mut bass = Part::new();
        let mut piano = Part::new();

        for (chord, &dur) in chords.iter().zip(rhythm.iter()) {
            bass.notes.push(fit(chord.root as i64 + 60, BASS_REGISTER) as f64);
            bass.durations.push(dur);
            bass.intensity.push(BASS_INTENSITY);

            let tones = chord.tones();
            let split = dur / tones.len() as f64;
            for pc in tones {
                piano.notes.push(fit(pc as i64 + 60, PIANO_REGISTER) as f64);
                piano.durations.push(split);
                piano.intensity.push(PIANO_INTENSITY);
            }
        }

        let mut parts = HashMap::new();
        parts.insert("bass".to_string(), bass);
        parts.insert("piano".to_string(), piano);
        parts
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a MIDI pitch by octaves into `[lo, hi]`.
fn fit(mut midi: i64, (lo, hi): (i64, i64)) -> i64 {
    while midi < lo {
        midi += 12;
    }
    while midi > hi {
        midi -= 12;
    }
    midi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chords(symbols: &[&str]) -> Vec<ChordSymbol> {
        symbols
            .iter()
            .map(|s| ChordSymbol::parse(s).unwrap())
            .collect()
    }

    #[test]
    fn bass_and_piano_registers() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&chords(&["C", "G"]), &[2.0, 2.0]);

        let bass = &parts["bass"];
        assert_eq!(bass.notes.len(), 2);
        for &note in &bass.notes {
            assert!(
                (BASS_REGISTER.0 as f64..=BASS_REGISTER.1 as f64).contains(&note),
                "bass note {note} out of register"
            );
        }

        let piano = &parts["piano"];
        // At least 2 notes per chord (triads give 3).
        assert!(piano.notes.len() >= 4);
        for &note in &piano.notes {
            assert!(
                (PIANO_REGISTER.0 as f64..=PIANO_REGISTER.1 as f64).contains(&note),
                "piano note {note} out of register"
            );
        }
    }

    #[test]
    fn part_durations_sum_to_rhythm() {
        let orc = Orchestrator::new();
        let rhythm = [2.0, 1.5, 0.5];
        let parts = orc.voice(&chords(&["C", "Am", "G7"]), &rhythm);
        let total: f64 = rhythm.iter().sum();
        for (role, part) in &parts {
            let sum: f64 = part.durations.iter().sum();
            assert!(
                (sum - total).abs() < 1e-6,
                "{role} durations sum {sum} != {total}"
            );
        }
    }

    #[test]
    fn parts_are_internally_consistent() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&chords(&["C", "F", "G"]), &[1.0, 1.0, 2.0]);
        for part in parts.values() {
            assert_eq!(part.notes.len(), part.durations.len());
            assert_eq!(part.notes.len(), part.intensity.len());
        }
    }

    #[test]
    fn bass_follows_chord_roots() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&chords(&["C", "G", "Am"]), &[1.0, 1.0, 1.0]);
        let roots: Vec<i64> = parts["bass"].notes.iter().map(|&n| n as i64 % 12).collect();
        assert_eq!(roots, vec![0, 7, 9]);
    }

    #[test]
    fn seventh_chord_spreads_four_tones() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&chords(&["G7"]), &[2.0]);
        assert_eq!(parts["piano"].notes.len(), 4);
        for &d in &parts["piano"].durations {
            assert!((d - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn intensities_fixed_per_role() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&chords(&["C"]), &[1.0]);
        assert!(parts["bass"].intensity.iter().all(|&i| i == BASS_INTENSITY));
        assert!(parts["piano"]
            .intensity
            .iter()
            .all(|&i| i == PIANO_INTENSITY));
    }

    #[test]
    fn fit_folds_by_octaves() {
        assert_eq!(fit(60, BASS_REGISTER), 48);
        assert_eq!(fit(0, BASS_REGISTER), 36);
        assert_eq!(fit(100, PIANO_REGISTER), 88);
        assert_eq!(fit(60, PIANO_REGISTER), 60);
    }

    #[test]
    fn empty_chords_empty_parts() {
        let orc = Orchestrator::new();
        let parts = orc.voice(&[], &[]);
        assert!(parts["bass"].notes.is_empty());
        assert!(parts["piano"].notes.is_empty());
    }
}
