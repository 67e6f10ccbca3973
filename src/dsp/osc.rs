//! Oscillators — sine, low-frequency modulator, and a two-operator FM pair.

use std::f64::consts::TAU;

/// Phase-accumulator sine oscillator.
#[derive(Debug, Clone)]
pub struct SineOsc {
    phase: f64,
    freq: f64,
    sample_rate: f64,
}

impl SineOsc {
    pub fn new(sample_rate: f64, freq: f64) -> Self {
        Self {
            phase: 0.0,
            freq,
            sample_rate,
        }
    }

    /// Start at a specific phase in [0, 1).
    pub fn with_phase(sample_rate: f64, freq: f64, phase: f64) -> Self {
        Self {
            phase: phase.rem_euclid(1.0),
            freq,
            sample_rate,
        }
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Reset the phase to zero (used when re-striking a note).
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn next(&mut self) -> f64 {
        let out = (self.phase * TAU).sin();
        self.phase = (self.phase + self.freq / self.sample_rate).rem_euclid(1.0);
        out
    }
}

/// Low-frequency sine used for drift, panning, and tremolo.
///
/// Output per sample is `add + mul * sin(2π·phase)`.
#[derive(Debug, Clone)]
pub struct Lfo {
    osc: SineOsc,
    pub mul: f64,
    pub add: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64, freq: f64, mul: f64, add: f64) -> Self {
        Self {
            osc: SineOsc::new(sample_rate, freq),
            mul,
            add,
        }
    }

    pub fn with_phase(sample_rate: f64, freq: f64, mul: f64, add: f64, phase: f64) -> Self {
        Self {
            osc: SineOsc::with_phase(sample_rate, freq, phase),
            mul,
            add,
        }
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.osc.set_freq(freq);
    }

    pub fn next(&mut self) -> f64 {
        self.add + self.mul * self.osc.next()
    }
}

/// Two-operator FM pair via phase modulation:
/// `sin(2π·φc + index·sin(2π·φm))` with the modulator at
/// `carrier_freq · ratio`.
#[derive(Debug, Clone)]
pub struct FmOsc {
    car_phase: f64,
    mod_phase: f64,
    carrier_freq: f64,
    ratio: f64,
    index: f64,
    sample_rate: f64,
}

impl FmOsc {
    pub fn new(sample_rate: f64, carrier_freq: f64, ratio: f64, index: f64) -> Self {
        Self {
            car_phase: 0.0,
            mod_phase: 0.0,
            carrier_freq,
            ratio,
            index,
            sample_rate,
        }
    }

    pub fn set_carrier_freq(&mut self, freq: f64) {
        self.carrier_freq = freq;
    }

    pub fn set_index(&mut self, index: f64) {
        self.index = index;
    }

    pub fn next(&mut self) -> f64 {
        let m = (self.mod_phase * TAU).sin();
        let out = (self.car_phase * TAU + self.index * m).sin();
        self.car_phase = (self.car_phase + self.carrier_freq / self.sample_rate).rem_euclid(1.0);
        self.mod_phase =
            (self.mod_phase + self.carrier_freq * self.ratio / self.sample_rate).rem_euclid(1.0);
        out
    }
}
