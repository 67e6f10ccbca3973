//! Audio engine — command queue, voice rack, master chain, device output.
//!
//! The control side holds an [`EngineHandle`] (the single producer of
//! the bounded command ring) and the engine worker drains it, renders
//! all live presets into blocks, and pushes the blocks at the cpal
//! output via [`AudioOut`]. The worker ([`Engine`]) has no audio
//! hardware dependency, so the whole command surface is testable.

pub mod command;
pub mod master;
pub mod output;
pub mod voice;

pub use command::EngineCommand;
pub use master::{Limiter, MasterEq, EQ_BANDS};
pub use output::AudioOut;
pub use voice::VoiceRack;

use std::sync::Arc;

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use crate::arrange::mixer::SpectralMixer;
use crate::preset::{Params, PresetRegistry, Value};

/// Engine-side errors.
#[derive(Debug)]
pub enum EngineError {
    /// Command ring buffer is full — the block's command is dropped.
    QueueFull,
    /// No audio output device found.
    NoOutputDevice,
    /// Failed to query device configuration.
    DeviceConfig(String),
    /// Failed to build the audio stream.
    StreamBuild(String),
    /// Failed to start the audio stream.
    StreamPlay(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::QueueFull => write!(f, "engine command queue is full"),
            EngineError::NoOutputDevice => write!(f, "no audio output device found"),
            EngineError::DeviceConfig(e) => write!(f, "device config error: {e}"),
            EngineError::StreamBuild(e) => write!(f, "stream build error: {e}"),
            EngineError::StreamPlay(e) => write!(f, "stream play error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Default command queue capacity.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Build the bounded SPSC command queue. The handle is the single
/// producer; the consumer goes to [`Engine::new`].
pub fn command_queue(capacity: usize) -> (EngineHandle, HeapCons<EngineCommand>) {
    let rb = HeapRb::<EngineCommand>::new(capacity);
    let (producer, consumer) = rb.split();
    (EngineHandle { producer }, consumer)
}

/// The control side of the engine: non-blocking command submission.
/// A full queue returns [`EngineError::QueueFull`] — a block is better
/// skipped than delayed.
pub struct EngineHandle {
    producer: HeapProd<EngineCommand>,
}

impl EngineHandle {
    fn push(&mut self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.producer.try_push(cmd).map_err(|_| EngineError::QueueFull)
    }

    pub fn play_preset(&mut self, preset: &str, params: Params) -> Result<(), EngineError> {
        self.push(EngineCommand::PlayPreset {
            preset: preset.to_string(),
            params,
        })
    }

    pub fn stop_preset(&mut self, preset: &str, fade_ms: f64) -> Result<(), EngineError> {
        self.push(EngineCommand::StopPreset {
            preset: preset.to_string(),
            fade_ms,
        })
    }

    pub fn set_param(&mut self, preset: &str, key: &str, value: Value) -> Result<(), EngineError> {
        self.push(EngineCommand::SetParam {
            preset: preset.to_string(),
            key: key.to_string(),
            value,
        })
    }

    pub fn set_eq_gain(&mut self, band_hz: f64, gain: f64) -> Result<(), EngineError> {
        self.push(EngineCommand::SetEqGain { band_hz, gain })
    }

    pub fn stop_all(&mut self, fade_ms: f64) -> Result<(), EngineError> {
        self.push(EngineCommand::StopAll { fade_ms })
    }

    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        self.push(EngineCommand::Shutdown)
    }
}

/// The engine worker: drains commands, renders voices, applies the
/// master EQ and limiter.
pub struct Engine {
    consumer: HeapCons<EngineCommand>,
    registry: Arc<PresetRegistry>,
    rack: VoiceRack,
    eq: MasterEq,
    limiter: Limiter,
    mixer: Option<SpectralMixer>,
    sample_rate: f64,
    shutdown: bool,
}

impl Engine {
    pub fn new(
        consumer: HeapCons<EngineCommand>,
        registry: Arc<PresetRegistry>,
        sample_rate: f64,
    ) -> Self {
        Self {
            consumer,
            registry,
            rack: VoiceRack::new(sample_rate),
            eq: MasterEq::new(sample_rate),
            limiter: Limiter::default(),
            mixer: None,
            sample_rate,
            shutdown: false,
        }
    }

    /// Enable the spectral auto-EQ: rendered blocks are analyzed and
    /// the band gains follow the inverse of the averaged spectrum.
    pub fn enable_auto_eq(&mut self) {
        self.mixer = Some(SpectralMixer::new(self.sample_rate));
    }

    /// Drain and apply all pending commands. Returns how many were
    /// handled.
    pub fn process(&mut self) -> usize {
        let snapshot = self.registry.snapshot();
        let mut handled = 0;
        while let Some(cmd) = self.consumer.try_pop() {
            handled += 1;
            match cmd {
                EngineCommand::PlayPreset { preset, params } => {
                    self.rack.play(&snapshot, &preset, &params);
                }
                EngineCommand::StopPreset { preset, fade_ms } => {
                    self.rack.stop(&preset, fade_ms);
                }
                EngineCommand::SetParam { preset, key, value } => {
                    self.rack.set_param(&preset, &key, &value);
                }
                EngineCommand::SetEqGain { band_hz, gain } => {
                    self.eq.set_gain(band_hz, gain);
                }
                EngineCommand::StopAll { fade_ms } => {
                    self.rack.stop_all(fade_ms);
                }
                EngineCommand::Shutdown => {
                    self.rack.stop_all(500.0);
                    self.shutdown = true;
                }
            }
        }
        handled
    }

    /// Render one interleaved stereo block of `frames` frames.
    pub fn render_block(&mut self, frames: usize) -> Vec<f32> {
        let mut block = vec![0.0f32; frames * 2];
        self.rack.render(&mut block);
        if let Some(mixer) = &mut self.mixer {
            for (band, gain) in mixer.analyze(&block) {
                self.eq.set_gain(band, gain);
            }
        }
        self.eq.process_block(&mut block);
        self.limiter.process_block(&mut block);
        block
    }

    pub fn active_voices(&self) -> usize {
        self.rack.active_count()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
