//! Harmonic swarm — detuned partials with per-voice amplitude motion
//! and multi-tap delay feedback.

use crate::dsp::{DelayLine, Lfo, SineOsc};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

struct SwarmVoice {
    osc: SineOsc,
    motion: Lfo,
}

pub struct Swarm {
    core: VoiceCore,
    voices: Vec<SwarmVoice>,
    delays: Vec<DelayLine>,
    delay_mul: f64,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("base_freq".into(), Value::Float(110.0));
    p.insert("num_voices".into(), Value::Int(6));
    p.insert("freq_ratio".into(), Value::Float(1.01));
    p.insert("pan_rate".into(), Value::Float(0.05));
    p.insert("pan_depth".into(), Value::Float(1.0));
    p.insert("delay_times".into(), Value::List(vec![0.1, 0.2, 0.3]));
    p.insert("delay_feedback".into(), Value::Float(0.3));
    p.insert("delay_mul".into(), Value::Float(0.4));
    p.insert("intensity".into(), Value::Float(0.2));
    p.insert("duration".into(), Value::Float(4.7));
    p.insert("enable_reverb".into(), Value::Bool(true));
    p.insert("stereo_w".into(), Value::Float(0.3));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "swarm",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(Swarm::new(sr, params)),
    }
}

impl Swarm {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.2,
                duration: Some(4.7),
                enable_reverb: true,
                stereo_w: 0.3,
                ..VoiceOpts::default()
            },
        );
        let base = params.f64_or("base_freq", 110.0);
        let num_voices = params.i64_or("num_voices", 6).clamp(1, 32) as usize;
        let ratio = params.f64_or("freq_ratio", 1.01);
        let pan_rate = params.f64_or("pan_rate", 0.05);
        let pan_depth = params.f64_or("pan_depth", 1.0).clamp(0.0, 1.0);

        let voices = (0..num_voices)
            .map(|i| SwarmVoice {
                osc: SineOsc::new(sample_rate, base * ratio.powi(i as i32)),
                // Staggered phases spread the amplitude motion across voices.
                motion: Lfo::with_phase(
                    sample_rate,
                    pan_rate,
                    pan_depth / 2.0,
                    1.0 - pan_depth / 2.0,
                    i as f64 / num_voices as f64,
                ),
            })
            .collect();

        let feedback = params.f64_or("delay_feedback", 0.3);
        let delay_times = params
            .list("delay_times")
            .unwrap_or_else(|| vec![0.1, 0.2, 0.3]);
        let delays = delay_times
            .iter()
            .filter(|t| **t > 0.0)
            .map(|&t| DelayLine::new(sample_rate, t, feedback))
            .collect();

        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.05, 0.5),
            voices,
            delays,
            delay_mul: params.f64_or("delay_mul", 0.4),
        }
    }
}

impl Preset for Swarm {
    fn kind(&self) -> &'static str {
        "swarm"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        match (key, value.as_f64()) {
            ("delay_mul", Some(v)) => self.delay_mul = v.clamp(0.0, 1.0),
            ("delay_feedback", Some(v)) => {
                for d in &mut self.delays {
                    d.set_feedback(v);
                }
            }
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        let n = self.voices.len().max(1) as f64;
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let mut mix = 0.0;
            for v in &mut self.voices {
                mix += v.osc.next() * v.motion.next() / n;
            }
            let wet: f64 = self.delays.iter_mut().map(|d| d.process(mix)).sum();
            let dry = (mix + wet * self.delay_mul) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
