//! Voice rack — live preset instances keyed by preset name.
//!
//! Re-playing a name crossfades: the old instance moves to a dying list
//! and fades out while the new one fades in. Dead instances are swept
//! after each render.

use std::collections::HashMap;

use crate::preset::{Params, Preset, RegistrySnapshot, Value};

/// Fade applied to the outgoing instance when a name is replayed.
const CROSSFADE_MS: f64 = 250.0;

pub struct VoiceRack {
    voices: HashMap<String, Box<dyn Preset>>,
    dying: Vec<Box<dyn Preset>>,
    sample_rate: f64,
}

impl VoiceRack {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            voices: HashMap::new(),
            dying: Vec::new(),
            sample_rate,
        }
    }

    /// Instantiate and start a preset. An unknown name logs a warning
    /// and is dropped; the rack never fails.
    pub fn play(&mut self, registry: &RegistrySnapshot, name: &str, params: &Params) {
        let Some(mut preset) = registry.instantiate(name, self.sample_rate, params) else {
            log::warn!("unknown preset '{name}', dropping play command");
            return;
        };
        if let Err(e) = preset.play() {
            log::warn!("preset '{name}' failed to start: {e}");
            return;
        }
        if let Some(mut old) = self.voices.insert(name.to_string(), preset) {
            old.stop(CROSSFADE_MS);
            self.dying.push(old);
        }
    }

    /// Begin fade-out for a named instance.
    pub fn stop(&mut self, name: &str, fade_ms: f64) {
        if let Some(mut voice) = self.voices.remove(name) {
            voice.stop(fade_ms);
            self.dying.push(voice);
        }
    }

    /// Fade out everything.
    pub fn stop_all(&mut self, fade_ms: f64) {
        let names: Vec<String> = self.voices.keys().cloned().collect();
        for name in names {
            self.stop(&name, fade_ms);
        }
    }

    /// Slew a live parameter.
    pub fn set_param(&mut self, name: &str, key: &str, value: &Value) {
        match self.voices.get_mut(name) {
            Some(voice) => voice.set(key, value),
            None => log::warn!("set_param on unknown preset '{name}'"),
        }
    }

    /// Render every live instance additively into `out`, then reclaim
    /// the dead.
    pub fn render(&mut self, out: &mut [f32]) {
        for voice in self.voices.values_mut() {
            voice.render(out);
        }
        for voice in &mut self.dying {
            voice.render(out);
        }
        self.voices.retain(|_, v| !v.is_dead());
        self.dying.retain(|v| !v.is_dead());
    }

    /// Live instance count, fading ones included.
    pub fn active_count(&self) -> usize {
        self.voices.len() + self.dying.len()
    }
}
