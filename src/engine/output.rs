//! Device output — a cpal stream fed pre-rendered blocks over a
//! lock-free ring buffer. The callback only copies samples, fills
//! silence on underrun, and applies the safety limiter.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use super::master::Limiter;
use super::EngineError;

/// Ring buffer capacity in blocks.
const BLOCK_RING_CAPACITY: usize = 64;
/// Compact the playback buffer once this many samples are consumed.
const COMPACT_THRESHOLD: usize = 16384;

/// State living on the cpal audio thread.
struct OutputSink {
    consumer: HeapCons<Vec<f32>>,
    playback: Vec<f32>,
    read_pos: usize,
    limiter: Limiter,
}

impl OutputSink {
    fn fill(&mut self, output: &mut [f32]) {
        while let Some(block) = self.consumer.try_pop() {
            self.playback.extend_from_slice(&block);
        }

        let available = self.playback.len() - self.read_pos;
        let copy_len = output.len().min(available);
        output[..copy_len]
            .copy_from_slice(&self.playback[self.read_pos..self.read_pos + copy_len]);
        self.read_pos += copy_len;

        // Silence on underrun.
        for sample in output[copy_len..].iter_mut() {
            *sample = 0.0;
        }

        self.limiter.process_block(output);

        if self.read_pos >= COMPACT_THRESHOLD {
            self.playback.drain(..self.read_pos);
            self.read_pos = 0;
        }
    }
}

/// The device side of the engine. Owns the cpal stream and the block
/// ring producer.
pub struct AudioOut {
    _stream: cpal::Stream,
    producer: HeapProd<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOut {
    /// Open the default output device with its default configuration.
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::DeviceConfig(e.to_string()))?;
        Self::build(&device, config.sample_rate().0, config.channels())
    }

    fn build(device: &cpal::Device, sample_rate: u32, channels: u16) -> Result<Self, EngineError> {
        let rb = HeapRb::<Vec<f32>>::new(BLOCK_RING_CAPACITY);
        let (producer, consumer) = rb.split();

        let mut sink = OutputSink {
            consumer,
            playback: Vec::with_capacity(sample_rate as usize * channels as usize),
            read_pos: 0,
            limiter: Limiter::default(),
        };

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err: cpal::StreamError| {
            log::error!("audio stream error: {err}");
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    sink.fill(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| EngineError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| EngineError::StreamPlay(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
            channels,
        })
    }

    /// Queue one rendered block (interleaved samples) for playback.
    /// A full ring hands the block back so the caller can retry it —
    /// rendered audio is continuous and must not be skipped here.
    pub fn send(&mut self, block: Vec<f32>) -> Result<(), Vec<f32>> {
        self.producer.try_push(block)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
