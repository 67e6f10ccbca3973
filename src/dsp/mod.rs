//! DSP graph primitives — stateful nodes composed into preset graphs.
//!
//! All nodes process one sample at a time at a fixed sample rate set at
//! construction. Mutable parameters either redesign coefficients on set
//! (filters) or are driven through a [`Smoothed`] scalar by the preset
//! layer so live changes stay click-free.

pub mod chorus;
pub mod delay;
pub mod envelope;
pub mod filter;
pub mod noise;
pub mod osc;
pub mod pan;
pub mod reverb;
pub mod smooth;

pub use chorus::Chorus;
pub use delay::DelayLine;
pub use envelope::{EnvelopeStage, FadeEnvelope};
pub use filter::Biquad;
pub use noise::{BitCrusher, NoiseGen};
pub use osc::{FmOsc, Lfo, SineOsc};
pub use pan::StereoPanner;
pub use reverb::Reverb;
pub use smooth::Smoothed;
