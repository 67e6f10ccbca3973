//! Freeverb-style reverb — four parallel combs into two series allpasses.

/// Comb delay lengths in samples at 44.1 kHz, scaled to the actual rate.
const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNINGS: [usize; 2] = [556, 441];
const DAMP: f64 = 0.2;

#[derive(Debug, Clone)]
struct Comb {
    buf: Vec<f64>,
    pos: usize,
    feedback: f64,
    filter_state: f64,
}

impl Comb {
    fn new(len: usize, feedback: f64) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            pos: 0,
            feedback,
            filter_state: 0.0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let out = self.buf[self.pos];
        self.filter_state = out * (1.0 - DAMP) + self.filter_state * DAMP;
        self.buf[self.pos] = x + self.filter_state * self.feedback;
        self.pos = (self.pos + 1) % self.buf.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buf: Vec<f64>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let delayed = self.buf[self.pos];
        let out = delayed - x;
        self.buf[self.pos] = x + delayed * 0.5;
        self.pos = (self.pos + 1) % self.buf.len();
        out
    }
}

/// Mono Freeverb-style reverb. `size` in [0, 1] scales the comb
/// feedback; `balance` in [0, 1] is the wet/dry mix.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    balance: f64,
}

impl Reverb {
    pub fn new(sample_rate: f64, size: f64, balance: f64) -> Self {
        let size = size.clamp(0.0, 1.0);
        let feedback = 0.7 + size * 0.28;
        let scale = sample_rate / 44100.0;
        let combs = COMB_TUNINGS
            .iter()
            .map(|&len| Comb::new((len as f64 * scale) as usize, feedback))
            .collect();
        let allpasses = ALLPASS_TUNINGS
            .iter()
            .map(|&len| Allpass::new((len as f64 * scale) as usize))
            .collect();
        Self {
            combs,
            allpasses,
            balance: balance.clamp(0.0, 1.0),
        }
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let mut wet: f64 = self.combs.iter_mut().map(|c| c.process(x)).sum();
        wet /= self.combs.len() as f64;
        for ap in &mut self.allpasses {
            wet = ap.process(wet);
        }
        x * (1.0 - self.balance) + wet * self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    #[test]
    fn impulse_produces_tail() {
        let mut r = Reverb::new(SR, 0.8, 1.0);
        r.process(1.0);
        // Energy should still be arriving well after the impulse.
        let mut late_energy = 0.0;
        for i in 0..(SR as usize / 2) {
            let y = r.process(0.0);
            if i > SR as usize / 4 {
                late_energy += y * y;
            }
        }
        assert!(late_energy > 1e-6, "expected a reverb tail");
    }

    #[test]
    fn dry_balance_passes_input() {
        let mut r = Reverb::new(SR, 0.8, 0.0);
        assert!((r.process(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tail_decays() {
        let mut r = Reverb::new(SR, 0.5, 1.0);
        r.process(1.0);
        let early: f64 = (0..4410).map(|_| r.process(0.0).abs()).sum();
        let late: f64 = (0..4410)
            .map(|_| {
                for _ in 0..9 {
                    r.process(0.0);
                }
                r.process(0.0).abs()
            })
            .sum();
        assert!(early > late, "tail must decay: early={early} late={late}");
    }

    #[test]
    fn output_stays_finite() {
        let mut r = Reverb::new(SR, 1.0, 1.0);
        for _ in 0..44_100 {
            let y = r.process(0.3);
            assert!(y.is_finite());
            assert!(y.abs() < 100.0);
        }
    }

    #[test]
    fn larger_size_longer_tail() {
        let energy_after = |size: f64| -> f64 {
            let mut r = Reverb::new(SR, size, 1.0);
            r.process(1.0);
            for _ in 0..22_050 {
                r.process(0.0);
            }
            (0..4410).map(|_| r.process(0.0).powi(2)).sum()
        };
        assert!(energy_after(0.95) > energy_after(0.1));
    }
}
