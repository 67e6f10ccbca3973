//! Filtered-noise beds: a high-passed air layer, a band-passed rain
//! layer with a slow center wobble, and a bit-crushed digital bed.

use crate::dsp::{Biquad, BitCrusher, DelayLine, Lfo, NoiseGen, Smoothed};
use crate::preset::registry::KindSpec;
use crate::preset::{Params, ParamsExt, Preset, PresetError, Value, VoiceCore, VoiceOpts};

/// High-pass filtered noise — airy hiss.
pub struct AirBed {
    core: VoiceCore,
    noise: NoiseGen,
    filter: Biquad,
    cutoff: Smoothed,
    applied_cutoff: f64,
}

pub fn air_bed_defaults() -> Params {
    let mut p = Params::new();
    p.insert("cutoff".into(), Value::Float(6000.0));
    p.insert("intensity".into(), Value::Float(0.3));
    p.insert("duration".into(), Value::Float(0.0));
    p.insert("stereo_w".into(), Value::Float(0.4));
    p
}

pub fn air_bed_spec() -> KindSpec {
    KindSpec {
        name: "air_bed",
        requires_melody: false,
        defaults: air_bed_defaults,
        ctor: |sr, params| Box::new(AirBed::new(sr, params)),
    }
}

impl AirBed {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.3,
                duration: None,
                stereo_w: 0.4,
                ..VoiceOpts::default()
            },
        );
        let cutoff = params.f64_or("cutoff", 6000.0);
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.5, 1.0),
            noise: NoiseGen::new(11),
            filter: Biquad::highpass(sample_rate, cutoff, 0.707),
            cutoff: Smoothed::new(sample_rate, cutoff),
            applied_cutoff: cutoff,
        }
    }
}

impl Preset for AirBed {
    fn kind(&self) -> &'static str {
        "air_bed"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        if key == "cutoff" {
            if let Some(v) = value.as_f64() {
                self.cutoff.set(v);
            }
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        let mut counter = 0u32;
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let c = self.cutoff.next();
            // Retune at control rate, not per sample.
            if counter % 64 == 0 && (c - self.applied_cutoff).abs() > 1.0 {
                self.filter.set_freq(c);
                self.applied_cutoff = c;
            }
            counter += 1;
            let dry = self.filter.process(self.noise.next()) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}

/// Band-pass filtered noise with a slow wobble on the center frequency.
pub struct RainBed {
    core: VoiceCore,
    noise: NoiseGen,
    filter: Biquad,
    wobble: Lfo,
    center: Smoothed,
}

pub fn rain_bed_defaults() -> Params {
    let mut p = Params::new();
    p.insert("center_freq".into(), Value::Float(1200.0));
    p.insert("q".into(), Value::Float(6.0));
    p.insert("wobble_rate".into(), Value::Float(0.11));
    p.insert("wobble_depth".into(), Value::Float(0.2));
    p.insert("intensity".into(), Value::Float(0.35));
    p.insert("duration".into(), Value::Float(0.0));
    p.insert("enable_reverb".into(), Value::Bool(true));
    p.insert("stereo_w".into(), Value::Float(0.6));
    p
}

pub fn rain_bed_spec() -> KindSpec {
    KindSpec {
        name: "rain_bed",
        requires_melody: false,
        defaults: rain_bed_defaults,
        ctor: |sr, params| Box::new(RainBed::new(sr, params)),
    }
}

impl RainBed {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.35,
                duration: None,
                enable_reverb: true,
                stereo_w: 0.6,
                ..VoiceOpts::default()
            },
        );
        let center = params.f64_or("center_freq", 1200.0);
        let q = params.f64_or("q", 6.0);
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.4, 1.0),
            noise: NoiseGen::new(13),
            filter: Biquad::bandpass(sample_rate, center, q),
            wobble: Lfo::new(
                sample_rate,
                params.f64_or("wobble_rate", 0.11),
                params.f64_or("wobble_depth", 0.2),
                1.0,
            ),
            center: Smoothed::new(sample_rate, center),
        }
    }
}

impl Preset for RainBed {
    fn kind(&self) -> &'static str {
        "rain_bed"
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
                self.center.set(v);
            }
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        let mut counter = 0u32;
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let center = self.center.next();
            // Retune at control rate, not per sample.
            if counter % 64 == 0 {
                self.filter.set_freq(center * self.wobble.next());
            }
            counter += 1;
            let dry = self.filter.process(self.noise.next()) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}

/// Bit-crushed noise through a comb delay and a cleanup high-pass.
pub struct CrushBed {
    core: VoiceCore,
    noise: NoiseGen,
    crusher: BitCrusher,
    comb: DelayLine,
    cleanup: Biquad,
    comb_mix: f64,
}

pub fn crush_bed_defaults() -> Params {
    let mut p = Params::new();
    p.insert("bit_depth".into(), Value::Int(6));
    p.insert("comb_delay".into(), Value::Float(0.04));
    p.insert("comb_feedback".into(), Value::Float(0.3));
    p.insert("comb_mix".into(), Value::Float(0.5));
    p.insert("hpf_freq".into(), Value::Float(138.93));
    p.insert("intensity".into(), Value::Float(0.3));
    p.insert("duration".into(), Value::Float(0.0));
    p
}

pub fn crush_bed_spec() -> KindSpec {
    KindSpec {
        name: "crush_bed",
        requires_melody: false,
        defaults: crush_bed_defaults,
        ctor: |sr, params| Box::new(CrushBed::new(sr, params)),
    }
}

impl CrushBed {
    pub fn new(sample_rate: f64, params: &Params) -> Self {
        let opts = VoiceOpts::from_params(
            params,
            VoiceOpts {
                intensity: 0.3,
                duration: None,
                ..VoiceOpts::default()
            },
        );
        Self {
            core: VoiceCore::new(sample_rate, &opts, 0.3, 0.8),
            noise: NoiseGen::new(17),
            crusher: BitCrusher::new(
                params.i64_or("bit_depth", 6).clamp(1, 24) as u32,
                4,
            ),
            comb: DelayLine::new(
                sample_rate,
                params.f64_or("comb_delay", 0.04),
                params.f64_or("comb_feedback", 0.3),
            ),
            cleanup: Biquad::highpass(sample_rate, params.f64_or("hpf_freq", 138.93), 0.707),
            comb_mix: params.f64_or("comb_mix", 0.5),
        }
    }
}

impl Preset for CrushBed {
    fn kind(&self) -> &'static str {
        "crush_bed"
    }

    fn play(&mut self) -> Result<(), PresetError> {
        self.core.play()
    }

    fn stop(&mut self, fade_ms: f64) {
        self.core.stop(fade_ms);
    }

    fn set(&mut self, key: &str, value: &Value) {
        match key {
            "bit_depth" => {
                if let Some(v) = value.as_i64() {
                    self.crusher.set_bits(v.clamp(1, 24) as u32);
                }
            }
            "comb_mix" => {
                if let Some(v) = value.as_f64() {
                    self.comb_mix = v.clamp(0.0, 1.0);
                }
            }
            _ => {}
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let gain = self.core.gain();
            let crushed = self.crusher.process(self.noise.next() * 0.5);
            let combed = self.comb.process(crushed);
            let dry = self.cleanup.process(crushed + combed * self.comb_mix) * gain;
            self.core.emit(dry, frame);
        }
    }

    fn is_dead(&self) -> bool {
        self.core.is_dead()
    }
}
