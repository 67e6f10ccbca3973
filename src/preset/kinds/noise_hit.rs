//! Gated noise hit — a short band-passed noise burst.

use crate::dsp::{Biquad, NoiseGen};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct NoiseHit {
    core: VoiceCore,
    noise: NoiseGen,
    body: Biquad,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("center_freq".into(), Value::Float(1800.0));
    p.insert("q".into(), Value::Float(1.2));
    p.insert("intensity".into(), Value::Float(0.64));
    p.insert("duration".into(), Value::Float(0.54));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "noise_hit",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(NoiseHit::new(sr, params)),
    }
}

impl NoiseHit {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.64,
                duration: Some(0.54),
                ..VoiceOpts::default()
            },
        );
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.01, 0.2),
            noise: NoiseGen::new(23),
            body: Biquad::bandpass(
                sample_rate,
                params.f64_or("center_freq", 1800.0),
                params.f64_or("q", 1.2),
            ),
        }
    }
}

impl Preset for NoiseHit {
    fn kind(&self) -> &'static str {
        "noise_hit"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        if key == "center_freq" {
            if let Some(v) = value.as_f64() {
                self.body.set_freq(v);
            }
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let dry = self.body.process(self.noise.next()) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
