//! Clipped sine lead — a vibrato-swept sine pushed through a soft
//! clipper for bite.

use crate::dsp::{Lfo, SineOsc, Smoothed};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct ClipLead {
    core: VoiceCore,
    osc: SineOsc,
    vibrato: Lfo,
    base_freq: Smoothed,
    drive: Smoothed,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("base_freq".into(), Value::Float(300.0));
    p.insert("mod_depth".into(), Value::Float(10.0));
    p.insert("mod_rate".into(), Value::Float(5.0));
    p.insert("drive".into(), Value::Float(0.35));
    p.insert("intensity".into(), Value::Float(0.9));
    p.insert("duration".into(), Value::Float(0.5));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "clip_lead",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(ClipLead::new(sr, params)),
    }
}

impl ClipLead {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.9,
                duration: Some(0.5),
                ..VoiceOpts::default()
            },
        );
        let base = params.f64_or("base_freq", 300.0);
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.1, 0.5),
            osc: SineOsc::new(sample_rate, base),
            vibrato: Lfo::new(
                sample_rate,
                params.f64_or("mod_rate", 5.0),
                params.f64_or("mod_depth", 10.0),
                0.0,
            ),
            base_freq: Smoothed::new(sample_rate, base),
            drive: Smoothed::new(sample_rate, params.f64_or("drive", 0.35)),
        }
    }
}

impl Preset for ClipLead {
    fn kind(&self) -> &'static str {
        "clip_lead"
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
            ("drive", Some(v)) => self.drive.set(v.clamp(0.0, 1.0)),
            ("mod_rate", Some(v)) => self.vibrato.set_freq(v),
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            self.osc.set_freq(self.base_freq.next() + self.vibrato.next());
            let drive = self.drive.next();
            let pushed = self.osc.next() * (1.0 + drive * 9.0);
            let dry = pushed.tanh() * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
