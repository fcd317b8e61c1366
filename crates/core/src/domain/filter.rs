//! Filter coefficient factory
//!
//! Pure, stateless coefficient computation: a peaking-EQ design plus
//! high-order Butterworth cut filters decomposed into cascaded 2nd-order
//! sections. Deterministic given identical inputs, callable from any
//! thread.
//!
//! Inputs are assumed valid (frequencies already clamped to the audible
//! range, positive sample rate); validation belongs to the parameter store
//! and the configuration layer.

use std::f32::consts::PI;

use num_complex::Complex64;

use crate::domain::params::{ChainSettings, Slope};

/// Biquad filter coefficients
///
/// Direct Form I convention, pre-normalized by a0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Peaking-EQ design for a single 2nd-order section.
    ///
    /// Boosts or cuts around `freq` by `gain_db`, with bandwidth set by `q`.
    /// At 0 dB gain the section degenerates to an exact identity.
    #[must_use]
    pub fn peak(sample_rate: f32, freq: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// 2nd-order highpass section with the given quality factor.
    #[must_use]
    pub fn highpass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// 2nd-order lowpass section with the given quality factor.
    #[must_use]
    pub fn lowpass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude of the section's transfer function at `freq`.
    ///
    /// Evaluates H(z) at z = e^{jω} on the unit circle. The evaluation runs
    /// in f64: near z = 1 the numerator of a cut section cancels almost
    /// completely and single precision would dominate the result.
    #[must_use]
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * std::f64::consts::PI * freq as f64 / sample_rate as f64;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;

        let numerator = Complex64::new(self.b0 as f64, 0.0) + z1 * self.b1 as f64 + z2 * self.b2 as f64;
        let denominator = Complex64::new(1.0, 0.0) + z1 * self.a1 as f64 + z2 * self.a2 as f64;

        (numerator / denominator).norm() as f32
    }
}

/// Coefficient sets for one cut-filter bank.
///
/// Always four section slots; `active` of them carry a designed section,
/// the rest stay at unity and are never assigned to a live stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutCoefficients {
    pub sections: [BiquadCoeffs; 4],
    /// Number of designed sections: slope ordinal + 1.
    pub active: usize,
}

/// Quality factor of section `k` of an order-`order` Butterworth cascade.
///
/// Standard pole-pairing for even-order Butterworth filters realized as
/// cascaded 2nd-order sections.
fn butterworth_section_q(order: usize, k: usize) -> f32 {
    let theta = (2.0 * k as f32 + 1.0) * PI / (2.0 * order as f32);
    1.0 / (2.0 * theta.sin())
}

/// Butterworth highpass of order `2 * slope.stages()` as cascaded sections.
#[must_use]
pub fn butterworth_highpass(sample_rate: f32, freq: f32, slope: Slope) -> CutCoefficients {
    let order = slope.filter_order();
    let mut sections = [BiquadCoeffs::default(); 4];
    for (k, section) in sections.iter_mut().take(slope.stages()).enumerate() {
        *section = BiquadCoeffs::highpass(sample_rate, freq, butterworth_section_q(order, k));
    }
    CutCoefficients {
        sections,
        active: slope.stages(),
    }
}

/// Butterworth lowpass of order `2 * slope.stages()` as cascaded sections.
#[must_use]
pub fn butterworth_lowpass(sample_rate: f32, freq: f32, slope: Slope) -> CutCoefficients {
    let order = slope.filter_order();
    let mut sections = [BiquadCoeffs::default(); 4];
    for (k, section) in sections.iter_mut().take(slope.stages()).enumerate() {
        *section = BiquadCoeffs::lowpass(sample_rate, freq, butterworth_section_q(order, k));
    }
    CutCoefficients {
        sections,
        active: slope.stages(),
    }
}

/// Peak-stage coefficients for a settings snapshot.
#[must_use]
pub fn peak_coefficients(settings: &ChainSettings, sample_rate: f32) -> BiquadCoeffs {
    BiquadCoeffs::peak(
        sample_rate,
        settings.peak_freq,
        settings.peak_q,
        settings.peak_gain_db,
    )
}

/// Low-cut (highpass) bank coefficients for a settings snapshot.
#[must_use]
pub fn low_cut_coefficients(settings: &ChainSettings, sample_rate: f32) -> CutCoefficients {
    butterworth_highpass(sample_rate, settings.low_cut_freq, settings.low_cut_slope)
}

/// High-cut (lowpass) bank coefficients for a settings snapshot.
#[must_use]
pub fn high_cut_coefficients(settings: &ChainSettings, sample_rate: f32) -> CutCoefficients {
    butterworth_lowpass(sample_rate, settings.high_cut_freq, settings.high_cut_slope)
}
