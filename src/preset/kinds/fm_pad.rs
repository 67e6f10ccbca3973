//! FM chorus pad — two-operator FM bell tone fattened with chorus and
//! reverb, long release tail.

use crate::dsp::{Chorus, FmOsc, Reverb, Smoothed};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

pub struct FmPad {
    core: VoiceCore,
    fm: FmOsc,
    chorus: Chorus,
    reverb: Reverb,
    carrier: Smoothed,
    index: Smoothed,
}

pub fn defaults() -> Params {
    let mut p = Params::new();
    p.insert("carrier_freq".into(), Value::Float(330.0));
    p.insert("mod_ratio".into(), Value::Float(2.0));
    p.insert("index".into(), Value::Float(5.0));
    p.insert("chorus_depth".into(), Value::Float(1.2));
    p.insert("chorus_feedback".into(), Value::Float(0.3));
    p.insert("reverb_size".into(), Value::Float(0.8));
    p.insert("reverb_bal".into(), Value::Float(0.4));
    p.insert("intensity".into(), Value::Float(0.6));
    p.insert("duration".into(), Value::Float(4.0));
    p.insert("stereo_w".into(), Value::Float(0.2));
    p
}

pub fn spec() -> KindSpec {
    KindSpec {
        name: "fm_pad",
        requires_melody: false,
        defaults,
        ctor: |sr, params| Box::new(FmPad::new(sr, params)),
    }
}

impl FmPad {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.6,
                duration: Some(4.0),
                stereo_w: 0.2,
                ..VoiceOpts::default()
            },
        );
        let carrier = params.f64_or("carrier_freq", 330.0);
        let index = params.f64_or("index", 5.0);
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.1, 1.0),
            fm: FmOsc::new(sample_rate, carrier, params.f64_or("mod_ratio", 2.0), index),
            chorus: Chorus::new(
                sample_rate,
                params.f64_or("chorus_depth", 1.2),
                params.f64_or("chorus_feedback", 0.3),
                0.5,
            ),
            reverb: Reverb::new(
                sample_rate,
                params.f64_or("reverb_size", 0.8),
                params.f64_or("reverb_bal", 0.4),
            ),
            carrier: Smoothed::new(sample_rate, carrier),
            index: Smoothed::new(sample_rate, index),
        }
    }
}

impl Preset for FmPad {
    fn kind(&self) -> &'static str {
        "fm_pad"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        match (key, value.as_f64()) {
            ("carrier_freq", Some(v)) => self.carrier.set(v),
            ("index", Some(v)) => self.index.set(v),
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            self.fm.set_carrier_freq(self.carrier.next());
            self.fm.set_index(self.index.next());
            let bell = self.fm.next();
            let dry = self.reverb.process(self.chorus.process(bell)) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_renders_audible_tone() {
        let mut pad = FmPad::new(44100.0, &defaults());
        pad.play().unwrap();
        let mut out = vec![0.0f32; 44100];
        pad.render(&mut out);
        let rms: f32 = (out.iter().map(|s| s * s).sum::<f32>() / out.len() as f32).sqrt();
        assert!(rms > 0.01, "rms={rms}");
    }

    #[test]
    fn pad_completes_its_duration() {
        let mut p = defaults();
        p.insert("duration".into(), Value::Float(0.2));
        let mut pad = FmPad::new(44100.0, &p);
        pad.play().unwrap();
        let mut out = vec![0.0f32; 8820];
        for _ in 0..12 {
            out.fill(0.0);
            pad.render(&mut out);
        }
        assert!(pad.is_dead());
    }

    #[test]
    fn index_glides_without_artifacts() {
        let mut pad = FmPad::new(44100.0, &defaults());
        pad.play().unwrap();
        pad.set("index", &Value::Float(9.0));
        let mut out = vec![0.0f32; 8192];
        pad.render(&mut out);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
