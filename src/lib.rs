//! Sempre — an always-on generative music engine.
//!
//! A [`maestro::Maestro`] drives named zones of synthesis presets in
//! tempo-synchronized blocks: melodies from the [`compositor`] are
//! analyzed into keys and chords, grown into progressions, orchestrated
//! across instrumental parts, auto-mixed, and rendered through the
//! [`preset`] bank. The control side and the audio side communicate
//! only through a bounded command queue, so all scheduling logic is
//! testable without audio hardware.

pub mod arrange;
pub mod compositor;
pub mod dsp;
pub mod engine;
pub mod maestro;
pub mod pool;
pub mod preset;
pub mod theory;
