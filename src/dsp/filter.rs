//! Biquad filters — RBJ cookbook low-pass, high-pass, band-pass, peaking.

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    Peaking,
}

/// Direct-form-I biquad with on-demand coefficient redesign.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f64,
    freq: f64,
    q: f64,
    gain_db: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn lowpass(sample_rate: f64, freq: f64, q: f64) -> Self {
        Self::design(FilterKind::LowPass, sample_rate, freq, q, 0.0)
    }

    pub fn highpass(sample_rate: f64, freq: f64, q: f64) -> Self {
        Self::design(FilterKind::HighPass, sample_rate, freq, q, 0.0)
    }

    pub fn bandpass(sample_rate: f64, freq: f64, q: f64) -> Self {
        Self::design(FilterKind::BandPass, sample_rate, freq, q, 0.0)
    }

    pub fn peaking(sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        Self::design(FilterKind::Peaking, sample_rate, freq, q, gain_db)
    }

    /// K-weighting pre-filter stage 1 (high shelf) at 48 kHz, per
    /// ITU-R BS.1770-4. Coefficients are the published constants.
    pub fn k_weight_shelf_48k() -> Self {
        Self::from_coeffs(
            48000.0,
            1.53512485958697,
            -2.69169618940638,
            1.19839281085285,
            -1.69065929318241,
            0.73248077421585,
        )
    }

    /// K-weighting stage 2 (RLB high-pass) at 48 kHz, per BS.1770-4.
    pub fn k_weight_highpass_48k() -> Self {
        Self::from_coeffs(
            48000.0,
            1.0,
            -2.0,
            1.0,
            -1.99004745483398,
            0.99007225036621,
        )
    }

    fn from_coeffs(sample_rate: f64, b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            kind: FilterKind::Peaking,
            sample_rate,
            freq: 0.0,
            q: 0.707,
            gain_db: 0.0,
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn design(kind: FilterKind, sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        let mut f = Self {
            kind,
            sample_rate,
            freq,
            q,
            gain_db,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        f.redesign();
        f
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq.clamp(10.0, self.sample_rate * 0.49);
        self.redesign();
    }

    pub fn set_gain_db(&mut self, gain_db: f64) {
        self.gain_db = gain_db;
        self.redesign();
    }

    fn redesign(&mut self) {
        let w0 = TAU * self.freq / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * self.q.max(1e-3));

        let (b0, b1, b2, a0, a1, a2) = match self.kind {
            FilterKind::LowPass => {
                let b1 = 1.0 - cos_w0;
                (
                    b1 / 2.0,
                    b1,
                    b1 / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterKind::HighPass => {
                let b1 = -(1.0 + cos_w0);
                (
                    -b1 / 2.0,
                    b1,
                    -b1 / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterKind::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::Peaking => {
                let a = 10.0f64.powf(self.gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
