//! Keys — the melodic voice. Requires `notes` and `durations`; renders
//! the sequence as sine tones with per-note attack/release envelopes.
//!
//! Note values below 128 are MIDI numbers, larger values are Hz.
//! Durations are in beats, scaled by the `tempo` parameter.

use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};
use crate::theory::note_to_freq;

const NOTE_ATTACK: f64 = 0.005;
const NOTE_RELEASE: f64 = 0.02;

struct Segment {
    freq: f64,
    start: usize,
    len: usize,
    amp: f64,
}

pub struct Keys {
    core: VoiceCore,
    segments: Vec<Segment>,
    total_samples: usize,
    cursor: usize,
    seg_idx: usize,
    phase: f64,
    sample_rate: f64,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("notes".into(), Value::List(vec![261.63, 329.63, 392.0]));
    p.insert("durations".into(), Value::List(vec![0.5, 0.5, 1.0]));
    p.insert("intensity".into(), Value::List(vec![0.8, 0.8, 0.8]));
    p.insert("tempo".into(), Value::Float(120.0));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "keys",
        requires_melody: true,
        defaults,
        ctor: |sr, params| Box::new(Keys::new(sr, params)),
    }
}

impl Keys {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.8,
                duration: None,
                ..VoiceOpts::default()
            },
        );
        let notes = params.list("notes").unwrap_or_default();
        let durations = params.list("durations").unwrap_or_default();
        let intensities = params
            .list("intensity")
            .unwrap_or_else(|| vec![opts.intensity; notes.len()]);

        let tempo = params.f64_or("tempo", 120.0).max(1.0);
        let beat_secs = 60.0 / tempo;

        let mut segments = Vec::with_capacity(notes.len());
        let mut start = 0usize;
        for (i, (&note, &dur)) in notes.iter().zip(durations.iter()).enumerate() {
            if dur <= 0.0 {
                continue;
            }
            let len = (dur * beat_secs * sample_rate) as usize;
            let amp = intensities.get(i).copied().unwrap_or(opts.intensity);
            segments.push(Segment {
                // Zero frequency is a rest: keep the slot, emit silence.
                freq: if note > 0.0 { note_to_freq(note) } else { 0.0 },
                start,
                len,
                amp: amp.clamp(0.0, 1.0),
            });
            start += len;
        }

        // The whole-voice envelope gates the sequence; intensity is per
        // note, so the core envelope runs at unit gain.
        let core_opts = VoiceOpts {
            intensity: 1.0,
            duration: None,
            ..opts
        };
        Self {
            core: VoiceCore::new(sample_rate, &core_opts, NOTE_ATTACK, NOTE_RELEASE),
            segments,
            total_samples: start,
            cursor: 0,
            seg_idx: 0,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Per-note envelope: linear attack in, linear release out.
    fn note_env(&self, t: f64, note_secs: f64) -> f64 {
        let rise = (t / NOTE_ATTACK).min(1.0);
        let fall = ((note_secs - t) / NOTE_RELEASE).clamp(0.0, 1.0);
        rise.min(fall)
    }
}

impl Preset for Keys {
    fn kind(&self) -> &'static str {
        "keys"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, _key: &str, _value: &Value) {}

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gate = self.core.gain();
            if self.cursor >= self.total_samples {
                break;
            }
            while self.seg_idx < self.segments.len()
                && self.cursor >= self.segments[self.seg_idx].start + self.segments[self.seg_idx].len
            {
                self.seg_idx += 1;
                self.phase = 0.0;
            }
            let Some(seg) = self.segments.get(self.seg_idx) else {
                break;
            };
            let dry = if seg.freq > 0.0 && seg.len > 0 {
                let t = (self.cursor - seg.start) as f64 / self.sample_rate;
                let note_secs = seg.len as f64 / self.sample_rate;
                let env = self.note_env(t, note_secs) * seg.amp;
                let s = (self.phase * std::f64::consts::TAU).sin() * env;
                self.phase = (self.phase + seg.freq / self.sample_rate).rem_euclid(1.0);
                s
            } else {
                0.0
            };
            self.cursor += 1;
            self.core.emit(dry * gate, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.cursor >= self.total_samples || self.core.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody_params(notes: Vec<f64>, durations: Vec<f64>, tempo: f64) -> Params {
        let mut p = Params::new();
        p.insert("notes".into(), Value::List(notes));
        p.insert("durations".into(), Value::List(durations));
        p.insert("tempo".into(), Value::Float(tempo));
        p
    }

    #[test]
    fn sequence_length_follows_tempo() {
        // Two one-beat notes at 120 BPM = 1 second total.
        let p = melody_params(vec![440.0, 523.25], vec![1.0, 1.0], 120.0);
        let k = Keys::new(44100.0, &p);
        assert_eq!(k.total_samples, 44100);
    }

    #[test]
    fn dies_after_sequence() {
        let p = melody_params(vec![440.0], vec![0.5], 120.0);
        let mut k = Keys::new(44100.0, &p);
        k.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        k.render(&mut out);
        assert!(k.is_dead());
    }

    #[test]
    fn renders_tone_for_each_note() {
        let p = melody_params(vec![440.0, 880.0], vec![0.5, 0.5], 120.0);
        let mut k = Keys::new(44100.0, &p);
        k.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        k.render(&mut out);
        let first: f32 = out[..11025].iter().map(|s| s.abs()).sum();
        let second: f32 = out[22050..33075].iter().map(|s| s.abs()).sum();
        assert!(first > 10.0, "first note silent: {first}");
        assert!(second > 10.0, "second note silent: {second}");
    }

    #[test]
    fn rest_is_silent() {
        let p = melody_params(vec![0.0], vec![1.0], 120.0);
        let mut k = Keys::new(44100.0, &p);
        k.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        k.render(&mut out);
        assert!(out.iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn midi_notes_accepted() {
        // MIDI 69 = 440 Hz; both encodings must produce the same pitch.
        let a = melody_params(vec![69.0], vec![1.0], 120.0);
        let b = melody_params(vec![440.0], vec![1.0], 120.0);
        let mut ka = Keys::new(44100.0, &a);
        let mut kb = Keys::new(44100.0, &b);
        ka.play().unwrap();
        kb.play().unwrap();
        let mut oa = vec![0.0f32; 8192];
        let mut ob = vec![0.0f32; 8192];
        ka.render(&mut oa);
        kb.render(&mut ob);
        for (x, y) in oa.iter().zip(ob.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn note_envelope_is_click_free() {
        let p = melody_params(vec![440.0, 880.0, 660.0], vec![0.25, 0.25, 0.25], 120.0);
        let mut k = Keys::new(44100.0, &p);
        k.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        k.render(&mut out);
        // No adjacent-sample jump beyond what the waveform itself can do.
        for w in out.windows(2) {
            assert!((w[1] - w[0]).abs() < 0.12, "click detected");
        }
    }

    #[test]
    fn empty_melody_is_immediately_dead() {
        let p = melody_params(vec![], vec![], 120.0);
        let k = Keys::new(44100.0, &p);
        assert!(k.is_dead());
    }
}
