//! Impulse-response tap — an additive harmonic burst rung through a
//! short comb tuned to the fundamental.

use crate::dsp::{DelayLine, SineOsc};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct ImpulseTap {
    core: VoiceCore,
    partials: Vec<SineOsc>,
    comb: DelayLine,
    comb_mix: f64,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("freq".into(), Value::Float(200.0));
    p.insert("harmonics".into(), Value::Int(6));
    p.insert("comb_mix".into(), Value::Float(0.5));
    p.insert("intensity".into(), Value::Float(0.5));
    p.insert("duration".into(), Value::Float(0.25));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "impulse_tap",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(ImpulseTap::new(sr, params)),
    }
}

impl ImpulseTap {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.5,
                duration: Some(0.25),
                ..VoiceOpts::default()
            },
        );
        let freq = params.f64_or("freq", 200.0).max(20.0);
        let harmonics = params.i64_or("harmonics", 6).clamp(1, 24) as usize;
        let partials = (0..harmonics)
            .map(|i| SineOsc::new(sample_rate, freq * (i + 1) as f64))
            .collect();
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.01, 0.25),
            partials,
            comb: DelayLine::new(sample_rate, 1.0 / freq, 0.7),
            comb_mix: params.f64_or("comb_mix", 0.5),
        }
    }
}

impl Preset for ImpulseTap {
    fn kind(&self) -> &'static str {
        "impulse_tap"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        if key == "comb_mix" {
            if let Some(v) = value.as_f64() {
                self.comb_mix = v.clamp(0.0, 1.0);
            }
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            // 1/n rolloff over the partials.
            let burst: f64 = self
                .partials
                .iter_mut()
                .enumerate()
                .map(|(i, osc)| osc.next() / (i + 1) as f64)
                .sum();
            let rung = self.comb.process(burst);
            let dry = (burst + rung * self.comb_mix) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
