//! Dual-oscillator drone — two sines a just ratio apart, each drifting
//! under a slow band-limited LFO. Always-on; restarts crossfade through
//! the long gate envelope.

use crate::dsp::{Lfo, SineOsc, Smoothed};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct DualDrone {
    core: VoiceCore,
    osc_a: SineOsc,
    osc_b: SineOsc,
    drift_a: Lfo,
    drift_b: Lfo,
    base_freq: Smoothed,
    ratio: f64,
    drift_ratio: f64,
    osc_amp: f64,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("base_freq".into(), Value::Float(65.4));
    p.insert("ratio".into(), Value::Float(4.0 / 3.0));
    p.insert("drift_speed".into(), Value::Float(0.04));
    p.insert("drift_ratio".into(), Value::Float(0.015));
    p.insert("osc_amp".into(), Value::Float(0.5));
    p.insert("fade".into(), Value::Float(2.0));
    p.insert("intensity".into(), Value::Float(0.5));
    p.insert("duration".into(), Value::Float(0.0));
    p.insert("enable_reverb".into(), Value::Bool(true));
    p.insert("stereo_w".into(), Value::Float(0.3));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "dual_drone",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(DualDrone::new(sr, params)),
    }
}

impl DualDrone {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.5,
                duration: None,
                enable_reverb: true,
                stereo_w: 0.3,
                ..VoiceOpts::default()
            },
        );
        let base = params.f64_or("base_freq", 65.4);
        let drift_speed = params.f64_or("drift_speed", 0.04);
        let fade = params.f64_or("fade", 2.0);
        // Opposed LFO phases so the two oscillators drift independently.
        Self {
            core: VoiceCore::new(sample_rate, &opts, fade, fade),
            osc_a: SineOsc::new(sample_rate, base),
            osc_b: SineOsc::new(sample_rate, base),
            drift_a: Lfo::with_phase(sample_rate, drift_speed, 1.0, 0.0, 0.0),
            drift_b: Lfo::with_phase(sample_rate, drift_speed, 1.0, 0.0, 0.5),
            base_freq: Smoothed::new(sample_rate, base),
            ratio: params.f64_or("ratio", 4.0 / 3.0),
            drift_ratio: params.f64_or("drift_ratio", 0.015),
            osc_amp: params.f64_or("osc_amp", 0.5),
        }
    }
}

impl Preset for DualDrone {
    fn kind(&self) -> &'static str {
        "dual_drone"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        match (key, value.as_f64()) {
            ("base_freq", Some(v)) => self.base_freq.set(v),
            ("ratio", Some(v)) => self.ratio = v,
            ("drift_ratio", Some(v)) => self.drift_ratio = v,
            ("osc_amp", Some(v)) => self.osc_amp = v,
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let base = self.base_freq.next();
            self.osc_a
                .set_freq(base * (1.0 + self.drift_a.next() * self.drift_ratio));
            self.osc_b
                .set_freq(base * self.ratio * (1.0 + self.drift_b.next() * self.drift_ratio));
            let dry = (self.osc_a.next() + self.osc_b.next()) * self.osc_amp * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
