//! Music theory primitives — pitch classes, keys, chord symbols.
//!
//! Shared by the harmonic analyser, the progression synthesizer, and
//! the orchestrator. Pitch classes are integers 0–11 with C = 0.

use std::fmt;

/// The twelve pitch-class names, sharps only.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a MIDI note number to frequency in Hz (A4 = 440).
pub fn midi_to_freq(midi: f64) -> f64 {
    440.0 * 2.0f64.powf((midi - 69.0) / 12.0)
}

/// Convert a frequency in Hz to a (fractional) MIDI note number.
pub fn freq_to_midi(freq: f64) -> f64 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

/// Pitch class (0–11) of a frequency in Hz.
pub fn freq_to_pitch_class(freq: f64) -> usize {
    let midi = freq_to_midi(freq).round() as i64;
    midi.rem_euclid(12) as usize
}

/// Interpret a part note value: values below 128 are MIDI note numbers,
/// anything else is already a frequency in Hz.
pub fn note_to_freq(value: f64) -> f64 {
    if value < 128.0 {
        midi_to_freq(value)
    } else {
        value
    }
}

/// Interpret a part note value as a MIDI note number.
pub fn note_to_midi(value: f64) -> f64 {
    if value < 128.0 {
        value
    } else {
        freq_to_midi(value)
    }
}

/// Parse a note name ("C", "F#", "Bb") into a pitch class.
pub fn parse_note_name(name: &str) -> Option<usize> {
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base = match letter {
        'C' => 0i64,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut pc = base;
    for c in chars {
        match c {
            '#' | '♯' => pc += 1,
            'b' | '♭' => pc -= 1,
            _ => return None,
        }
    }
    Some(pc.rem_euclid(12) as usize)
}

/// Major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// A key: tonic pitch class plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub tonic: usize,
    pub mode: Mode,
}

impl Key {
    pub const C_MAJOR: Key = Key {
        tonic: 0,
        mode: Mode::Major,
    };

    pub fn new(tonic: usize, mode: Mode) -> Self {
        Self {
            tonic: tonic % 12,
            mode,
        }
    }

    /// Parse a key string like "C major" or "a minor". Accidental
    /// glyphs (♭/♯) are normalized; anything unparseable falls back to
    /// C major, matching the progression synthesizer's tolerance.
    pub fn parse(s: &str) -> Key {
        let mut parts = s.split_whitespace();
        let tonic = parts.next().and_then(parse_note_name);
        let mode = match parts.next().map(|m| m.to_ascii_lowercase()) {
            Some(m) if m.starts_with("min") => Mode::Minor,
            _ => Mode::Major,
        };
        match tonic {
            Some(pc) => Key::new(pc, mode),
            None => Key::C_MAJOR,
        }
    }

    /// Semitone offsets of the seven scale degrees.
    pub fn scale_offsets(&self) -> [i64; 7] {
        match self.mode {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// Pitch class of the given scale degree (1-based).
    pub fn degree_pitch_class(&self, degree: usize) -> usize {
        let offset = self.scale_offsets()[(degree - 1) % 7];
        ((self.tonic as i64 + offset).rem_euclid(12)) as usize
    }

    /// The tonic triad as a chord symbol.
    pub fn tonic_chord(&self) -> ChordSymbol {
        ChordSymbol {
            root: self.tonic,
            quality: match self.mode {
                Mode::Major => Quality::Major,
                Mode::Minor => Quality::Minor,
            },
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", NOTE_NAMES[self.tonic], mode)
    }
}

/// Chord quality, expressed as the symbol suffix it renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    /// No suffix.
    Major,
    /// "m" suffix — also covers diminished in symbol form.
    Minor,
    /// "7" suffix.
    Dominant7,
}

/// A concrete chord symbol: root pitch class plus quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChordSymbol {
    pub root: usize,
    pub quality: Quality,
}

impl ChordSymbol {
    pub fn new(root: usize, quality: Quality) -> Self {
        Self {
            root: root % 12,
            quality,
        }
    }

    /// Parse a symbol like "C", "F#m", "G7".
    pub fn parse(s: &str) -> Option<ChordSymbol> {
        let (name_len, quality) = if s.ends_with('m') {
            (s.len() - 1, Quality::Minor)
        } else if s.ends_with('7') {
            (s.len() - 1, Quality::Dominant7)
        } else {
            (s.len(), Quality::Major)
        };
        let root = parse_note_name(&s[..name_len])?;
        Some(ChordSymbol { root, quality })
    }

    /// Chord tones as pitch classes, root first.
    pub fn tones(&self) -> Vec<usize> {
        let intervals: &[i64] = match self.quality {
            Quality::Major => &[0, 4, 7],
            Quality::Minor => &[0, 3, 7],
            Quality::Dominant7 => &[0, 4, 7, 10],
        };
        intervals
            .iter()
            .map(|i| ((self.root as i64 + i).rem_euclid(12)) as usize)
            .collect()
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.quality {
            Quality::Major => "",
            Quality::Minor => "m",
            Quality::Dominant7 => "7",
        };
        write!(f, "{}{}", NOTE_NAMES[self.root], suffix)
    }
}
