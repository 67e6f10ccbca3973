//! Sample-player voice — plays a named table from the builtin percussion
//! bank at a variable rate, optionally looping.
//!
//! Tables are synthesized at construction from a seed, so the voice is
//! self-contained and deterministic.

use crate::dsp::NoiseGen;
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct Sampler {
    core: VoiceCore,
    table: Vec<f64>,
    pos: f64,
    rate: f64,
    looping: bool,
    finished: bool,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("sample".into(), Value::Text("kick".into()));
    p.insert("rate".into(), Value::Float(1.0));
    p.insert("loop".into(), Value::Bool(false));
    p.insert("seed".into(), Value::Int(42));
    p.insert("intensity".into(), Value::Float(0.8));
    p.insert("duration".into(), Value::Float(0.0));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "sampler",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(Sampler::new(sr, params)),
    }
}

/// Sine body with an exponential pitch sweep and amplitude decay.
fn render_kick(sample_rate: f64) -> Vec<f64> {
    let n = (sample_rate * 0.25) as usize;
    let mut phase = 0.0f64;
    (0..n)
        .map(|i| {
            let norm = i as f64 / n as f64;
            let freq = 50.0 + 100.0 * (-norm * 8.0).exp();
            phase += freq / sample_rate;
            (phase * std::f64::consts::TAU).sin() * (-norm * 10.0).exp()
        })
        .collect()
}

/// Sine body plus noise, each with its own decay.
fn render_snap(sample_rate: f64, seed: u64) -> Vec<f64> {
    let n = (sample_rate * 0.2) as usize;
    let mut noise = NoiseGen::new(seed);
    let mut phase = 0.0f64;
    (0..n)
        .map(|i| {
            let norm = i as f64 / n as f64;
            phase += 180.0 / sample_rate;
            let body = (phase * std::f64::consts::TAU).sin() * (-norm * 15.0).exp();
            let hiss = noise.next() * (-norm * 12.0).exp();
            body * 0.5 + hiss * 0.5
        })
        .collect()
}

/// High-passed noise burst with a very fast decay.
fn render_tick(sample_rate: f64, seed: u64) -> Vec<f64> {
    let n = (sample_rate * 0.08) as usize;
    let mut noise = NoiseGen::new(seed);
    let mut prev_in = 0.0;
    let mut prev_out = 0.0;
    (0..n)
        .map(|i| {
            let norm = i as f64 / n as f64;
            let x = noise.next();
            // One-pole high-pass keeps only the sizzle.
            let hp = 0.85 * (prev_out + x - prev_in);
            prev_in = x;
            prev_out = hp;
            hp * (-norm * 20.0).exp()
        })
        .collect()
}

impl Sampler {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.8,
                duration: None,
                ..VoiceOpts::default()
            },
        );
        let seed = params.i64_or("seed", 42) as u64;
        let name = params
            .get("sample")
            .and_then(Value::as_str)
            .unwrap_or("kick");
        let table = match name {
            "snap" => render_snap(sample_rate, seed),
            "tick" => render_tick(sample_rate, seed),
            _ => render_kick(sample_rate),
        };
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.005, 0.02),
            table,
            pos: 0.0,
            rate: params.f64_or("rate", 1.0).clamp(0.1, 4.0),
            looping: params.bool_or("loop", false),
            finished: false,
        }
    }
}

impl Preset for Sampler {
    fn kind(&self) -> &'static str {
        "sampler"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        if key == "rate" {
            if let Some(v) = value.as_f64() {
                self.rate = v.clamp(0.1, 4.0);
            }
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        let len = self.table.len() as f64;
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            if self.finished {
                break;
            }
            let i0 = self.pos.floor() as usize;
            if i0 + 1 >= self.table.len() {
                if self.looping {
                    self.pos = 0.0;
                } else {
                    self.finished = true;
                    break;
                }
            }
            let i0 = self.pos.floor() as usize;
            let frac = self.pos - i0 as f64;
            let s = self.table[i0] * (1.0 - frac) + self.table[(i0 + 1) % self.table.len()] * frac;
            self.pos = (self.pos + self.rate) % len;
            self.core.emit(s * gain, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.finished || self.core.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_finishes() {
        let mut s = Sampler::new(44100.0, &defaults());
        s.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        s.render(&mut out);
        assert!(s.is_dead());
    }

    #[test]
    fn looping_keeps_playing() {
        let mut p = defaults();
        p.insert("loop".into(), Value::Bool(true));
        let mut s = Sampler::new(44100.0, &p);
        s.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        for _ in 0..4 {
            out.fill(0.0);
            s.render(&mut out);
        }
        assert!(!s.is_dead());
    }

    #[test]
    fn tables_are_deterministic() {
        let a = render_snap(44100.0, 7);
        let b = render_snap(44100.0, 7);
        assert_eq!(a, b);
        let c = render_snap(44100.0, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn all_tables_bounded() {
        for table in [
            render_kick(44100.0),
            render_snap(44100.0, 42),
            render_tick(44100.0, 42),
        ] {
            assert!(!table.is_empty());
            assert!(table.iter().all(|s| s.abs() <= 1.0 + 1e-9));
        }
    }

    #[test]
    fn rate_selects_speed() {
        let finish_blocks = |rate: f64| -> usize {
            let mut p = defaults();
            p.insert("rate".into(), Value::Float(rate));
            let mut s = Sampler::new(44100.0, &p);
            s.play().unwrap();
            let mut out = vec![0.0f32; 2048];
            for i in 0..100 {
                out.fill(0.0);
                s.render(&mut out);
                if s.is_dead() {
                    return i;
                }
            }
            100
        };
        assert!(finish_blocks(2.0) < finish_blocks(0.5));
    }
}
