//! Preset framework — the lifecycle contract every synthesis voice obeys.
//!
//! A preset is built from a [`Params`] map, starts with a fade-in when
//! [`Preset::play`] is called, responds to live [`Preset::set`] calls
//! through slew-limited parameters, fades out on [`Preset::stop`], and
//! reports [`Preset::is_dead`] once its envelope completes so the
//! engine can reclaim it. All amplitude paths run through a
//! [`FadeEnvelope`], which enforces the click-free minimum fade times.

pub mod kinds;
pub mod params;
pub mod registry;

pub use params::{Params, ParamsExt, ParamWalker, Value};
pub use registry::{KindSpec, PresetRegistry, RegistrySnapshot, Signature};

use crate::dsp::{Biquad, Chorus, FadeEnvelope, Reverb, StereoPanner};

/// Preset lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// `play` was called on an instance that is already playing.
    AlreadyPlaying,
}

impl std::fmt::Display for PresetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetError::AlreadyPlaying => write!(f, "preset is already playing"),
        }
    }
}

impl std::error::Error for PresetError {}

/// The contract every preset kind implements.
///
/// Instances are owned exclusively by the engine; rendering is
/// additive into an interleaved stereo buffer.
pub trait Preset: Send {
    /// The kind name this instance was built from.
    fn kind(&self) -> &'static str;

    /// Start the fade-in. Calling twice is an error.
    fn play(&mut self) -> Result<(), PresetError>;

    /// Begin the fade-out; the instance reports dead once it completes.
    fn stop(&mut self, fade_ms: f64);

    /// Update a parameter live. Routed through smoothed scalars — the
    /// graph is never rebuilt.
    fn set(&mut self, key: &str, value: &Value);

    /// Render one block, adding into `out` (interleaved stereo f32).
    fn render(&mut self, out: &mut [f32]);

    /// True once the envelope has completed and nodes can be dropped.
    fn is_dead(&self) -> bool;
}

/// Universal options every kind honors, parsed from the parameter map.
#[derive(Debug, Clone)]
pub struct VoiceOpts {
    pub intensity: f64,
    /// Target duration in seconds; `None` is an infinite drone.
    pub duration: Option<f64>,
    pub enable_reverb: bool,
    pub enable_chorus: bool,
    pub stereo_w: f64,
    pub gain_db: f64,
    pub pan: f64,
}

impl Default for VoiceOpts {
    fn default() -> Self {
        Self {
            intensity: 0.7,
            duration: Some(2.0),
            enable_reverb: false,
            enable_chorus: false,
            stereo_w: 0.0,
            gain_db: 0.0,
            pan: 0.0,
        }
    }
}

impl VoiceOpts {
    /// Read the universal options out of `params`, starting from the
    /// kind's own defaults. A `duration` of zero or less means infinite.
    pub fn from_params(params: &Params, defaults: VoiceOpts) -> Self {
        let duration = match params.get("duration").and_then(Value::as_f64) {
            Some(d) if d > 0.0 => Some(d),
            Some(_) => None,
            None => defaults.duration,
        };
        Self {
            intensity: params
                .f64_or("intensity", defaults.intensity)
                .clamp(0.0, 1.0),
            duration,
            enable_reverb: params.bool_or("enable_reverb", defaults.enable_reverb),
            enable_chorus: params.bool_or("enable_chorus", defaults.enable_chorus),
            stereo_w: params.f64_or("stereo_w", defaults.stereo_w).clamp(0.0, 1.0),
            gain_db: params.f64_or("gain_db", defaults.gain_db),
            pan: params.f64_or("pan", defaults.pan).clamp(-1.0, 1.0),
        }
    }
}

/// The shared effects tail: optional filter, chorus, reverb, then the
/// stereo panner and the gain trim from `gain_db`.
pub struct FxChain {
    filter: Option<Biquad>,
    chorus: Option<Chorus>,
    reverb: Option<Reverb>,
    panner: StereoPanner,
    gain: f64,
}

impl FxChain {
    pub fn new(sample_rate: f64, opts: &VoiceOpts) -> Self {
        Self::with_filter(sample_rate, opts, None)
    }

    pub fn with_filter(sample_rate: f64, opts: &VoiceOpts, filter: Option<Biquad>) -> Self {
        let chorus = if opts.enable_chorus {
            Some(Chorus::new(sample_rate, 0.8 * opts.stereo_w.max(0.2), 0.25, 0.5))
        } else {
            None
        };
        let reverb = if opts.enable_reverb {
            Some(Reverb::new(sample_rate, 0.8, 0.35))
        } else {
            None
        };
        Self {
            filter,
            chorus,
            reverb,
            panner: StereoPanner::new(sample_rate, opts.pan, opts.stereo_w),
            gain: 10.0f64.powf(opts.gain_db / 20.0),
        }
    }

    /// Run one dry sample through the chain into (left, right).
    pub fn process(&mut self, x: f64) -> (f64, f64) {
        let mut sig = x;
        if let Some(f) = &mut self.filter {
            sig = f.process(sig);
        }
        if let Some(c) = &mut self.chorus {
            sig = c.process(sig);
        }
        if let Some(r) = &mut self.reverb {
            sig = r.process(sig);
        }
        let (l, r) = self.panner.process(sig);
        (l * self.gain, r * self.gain)
    }
}

/// Envelope + FX shared by every kind: the common voice plumbing.
pub struct VoiceCore {
    env: FadeEnvelope,
    fx: FxChain,
    played: bool,
}

impl VoiceCore {
    pub fn new(sample_rate: f64, opts: &VoiceOpts, attack: f64, release: f64) -> Self {
        Self::with_filter(sample_rate, opts, attack, release, None)
    }

    pub fn with_filter(
        sample_rate: f64,
        opts: &VoiceOpts,
        attack: f64,
        release: f64,
        filter: Option<Biquad>,
    ) -> Self {
        Self {
            env: FadeEnvelope::new(sample_rate, attack, release, opts.duration, opts.intensity),
            fx: FxChain::with_filter(sample_rate, opts, filter),
            played: false,
        }
    }

    pub fn play(&mut self) -> Result<(), PresetError> {
        if self.played {
            return Err(PresetError::AlreadyPlaying);
        }
        self.played = true;
        self.env.play();
        Ok(())
    }

    pub fn stop(&mut self, fade_ms: f64) {
        self.env.release(Some(fade_ms / 1000.0));
    }

    pub fn is_dead(&self) -> bool {
        self.env.is_done()
    }

    pub fn is_playing(&self) -> bool {
        self.played
    }

    /// Envelope gain for the next sample.
    pub fn gain(&mut self) -> f64 {
        self.env.next()
    }

    /// Push one dry sample through the FX chain into a stereo frame.
    pub fn emit(&mut self, dry: f64, frame: &mut [f32]) {
        let (l, r) = self.fx.process(dry);
        frame[0] += l as f32;
        frame[1] += r as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    #[test]
    fn opts_defaults() {
        let opts = VoiceOpts::from_params(&Params::new(), VoiceOpts::default());
        assert!((opts.intensity - 0.7).abs() < 1e-12);
        assert_eq!(opts.duration, Some(2.0));
        assert!(!opts.enable_reverb);
    }

    #[test]
    fn opts_from_params_override() {
        let mut p = Params::new();
        p.insert("intensity".into(), Value::Float(0.4));
        p.insert("enable_reverb".into(), Value::Bool(true));
        p.insert("stereo_w".into(), Value::Float(0.3));
        p.insert("gain_db".into(), Value::Float(-6.0));
        let opts = VoiceOpts::from_params(&p, VoiceOpts::default());
        assert!((opts.intensity - 0.4).abs() < 1e-12);
        assert!(opts.enable_reverb);
        assert!((opts.stereo_w - 0.3).abs() < 1e-12);
        assert!((opts.gain_db - (-6.0)).abs() < 1e-12);
    }

    #[test]
    fn opts_zero_duration_means_infinite() {
        let mut p = Params::new();
        p.insert("duration".into(), Value::Float(0.0));
        let opts = VoiceOpts::from_params(&p, VoiceOpts::default());
        assert_eq!(opts.duration, None);
    }

    #[test]
    fn opts_intensity_clamped() {
        let mut p = Params::new();
        p.insert("intensity".into(), Value::Float(3.0));
        let opts = VoiceOpts::from_params(&p, VoiceOpts::default());
        assert!((opts.intensity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn core_play_twice_is_error() {
        let opts = VoiceOpts::default();
        let mut core = VoiceCore::new(SR, &opts, 0.01, 0.05);
        assert!(core.play().is_ok());
        assert_eq!(core.play(), Err(PresetError::AlreadyPlaying));
    }

    #[test]
    fn core_stop_leads_to_dead() {
        let opts = VoiceOpts {
            duration: None,
            ..VoiceOpts::default()
        };
        let mut core = VoiceCore::new(SR, &opts, 0.005, 0.02);
        core.play().unwrap();
        for _ in 0..2000 {
            core.gain();
        }
        core.stop(50.0);
        for _ in 0..(SR as usize / 10) {
            core.gain();
        }
        assert!(core.is_dead());
    }

    #[test]
    fn fx_gain_db_applied() {
        let opts = VoiceOpts {
            gain_db: -20.0,
            ..VoiceOpts::default()
        };
        let mut fx = FxChain::new(SR, &opts);
        let (l, r) = fx.process(1.0);
        // -20 dB = 0.1 linear, split equal-power across channels.
        let total = (l * l + r * r).sqrt();
        assert!((total - 0.1).abs() < 1e-6, "got {total}");
    }

    #[test]
    fn fx_plain_chain_is_centered() {
        let opts = VoiceOpts::default();
        let mut fx = FxChain::new(SR, &opts);
        let (l, r) = fx.process(0.5);
        assert!((l - r).abs() < 1e-9);
    }
}
