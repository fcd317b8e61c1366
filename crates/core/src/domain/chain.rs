//! Per-channel filter chains
//!
//! A mono chain is the ordered cascade [low-cut bank] → [peak stage] →
//! [high-cut bank]. Each cut bank holds exactly four 2nd-order stages; a
//! slope of ordinal N activates stages 0..=N and leaves the rest bypassed
//! in place, so the topology never changes shape. Stages own their
//! coefficients by value and keep their delay lines across coefficient
//! swaps, which preserves audio continuity when parameters move mid-stream.
//!
//! Left and right channels each own an independent chain; only the
//! coefficients are shared, computed once per block as a [`ChainUpdate`].

use crate::domain::filter::{
    high_cut_coefficients, low_cut_coefficients, peak_coefficients, BiquadCoeffs, CutCoefficients,
};
use crate::domain::params::ChainSettings;

/// One biquad stage with its own running state.
///
/// Direct Form I: better numerical behavior with low-frequency filters and
/// artifact-free coefficient updates.
#[derive(Debug, Clone)]
pub struct FilterStage {
    coeffs: BiquadCoeffs,
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
    bypassed: bool,
}

impl FilterStage {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            bypassed: false,
        }
    }

    /// Replace the coefficients in place.
    ///
    /// The delay line is deliberately kept: resetting it on every parameter
    /// move would produce audible discontinuities.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process a single sample through the difference equation.
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.coeffs.b0 * x + self.coeffs.b1 * self.x1 + self.coeffs.b2 * self.x2
            - self.coeffs.a1 * self.y1
            - self.coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Process a block in place. A bypassed stage is an exact no-op.
    pub fn process(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear the delay line without touching coefficients or bypass state.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        if self.bypassed {
            1.0
        } else {
            self.coeffs.magnitude_at(freq, sample_rate)
        }
    }
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new(BiquadCoeffs::default())
    }
}

/// A fixed bank of four cut-filter stages.
#[derive(Debug, Clone, Default)]
pub struct CutBank {
    stages: [FilterStage; 4],
    bypassed: bool,
}

impl CutBank {
    /// Apply a fresh coefficient set.
    ///
    /// All four stages are first bypassed, then every stage up to and
    /// including the configured ordinal is assigned its section and
    /// re-activated, in increasing index order.
    pub fn apply(&mut self, coeffs: &CutCoefficients, bank_bypassed: bool) {
        for stage in &mut self.stages {
            stage.set_bypassed(true);
        }
        for index in 0..coeffs.active {
            self.stages[index].set_coeffs(coeffs.sections[index]);
            self.stages[index].set_bypassed(false);
        }
        self.bypassed = bank_bypassed;
    }

    /// Number of stages currently active.
    pub fn active_stages(&self) -> usize {
        self.stages.iter().filter(|s| !s.is_bypassed()).count()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn process(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for stage in &mut self.stages {
            stage.process(block);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        if self.bypassed {
            return 1.0;
        }
        self.stages
            .iter()
            .map(|stage| stage.magnitude_at(freq, sample_rate))
            .product()
    }
}

/// All coefficients for one settings snapshot, computed once.
///
/// Both channel chains receive the same update, so the left and right
/// filters are numerically identical by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainUpdate {
    pub low_cut: CutCoefficients,
    pub peak: BiquadCoeffs,
    pub high_cut: CutCoefficients,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

impl ChainUpdate {
    pub fn from_settings(settings: &ChainSettings, sample_rate: f32) -> Self {
        Self {
            low_cut: low_cut_coefficients(settings, sample_rate),
            peak: peak_coefficients(settings, sample_rate),
            high_cut: high_cut_coefficients(settings, sample_rate),
            low_cut_bypassed: settings.low_cut_bypassed,
            peak_bypassed: settings.peak_bypassed,
            high_cut_bypassed: settings.high_cut_bypassed,
        }
    }
}

/// One channel's complete filter cascade.
#[derive(Debug, Clone, Default)]
pub struct MonoChain {
    low_cut: CutBank,
    peak: FilterStage,
    high_cut: CutBank,
}

impl MonoChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a precomputed coefficient update.
    ///
    /// The peak coefficients are replaced unconditionally; its active state
    /// follows the bypass flag alone.
    pub fn apply(&mut self, update: &ChainUpdate) {
        self.low_cut.apply(&update.low_cut, update.low_cut_bypassed);
        self.peak.set_coeffs(update.peak);
        self.peak.set_bypassed(update.peak_bypassed);
        self.high_cut
            .apply(&update.high_cut, update.high_cut_bypassed);
    }

    /// Recompute coefficients from a snapshot and apply them.
    pub fn update(&mut self, settings: &ChainSettings, sample_rate: f32) {
        self.apply(&ChainUpdate::from_settings(settings, sample_rate));
    }

    /// Run the cascade over a block in place: low cut, then peak, then
    /// high cut.
    pub fn process(&mut self, block: &mut [f32]) {
        self.low_cut.process(block);
        self.peak.process(block);
        self.high_cut.process(block);
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }

    pub fn low_cut(&self) -> &CutBank {
        &self.low_cut
    }

    pub fn peak(&self) -> &FilterStage {
        &self.peak
    }

    pub fn high_cut(&self) -> &CutBank {
        &self.high_cut
    }

    /// Magnitude of the whole cascade's frequency response at `freq`.
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        self.low_cut.magnitude_at(freq, sample_rate)
            * self.peak.magnitude_at(freq, sample_rate)
            * self.high_cut.magnitude_at(freq, sample_rate)
    }
}

/// Response magnitude for a settings snapshot without touching live chains.
///
/// Convenience for response-curve consumers: designs the coefficients for
/// `settings` and evaluates the cascade at `freq`.
pub fn response_magnitude(settings: &ChainSettings, sample_rate: f32, freq: f32) -> f32 {
    let update = ChainUpdate::from_settings(settings, sample_rate);

    let mut magnitude = 1.0;
    if !update.low_cut_bypassed {
        for section in &update.low_cut.sections[..update.low_cut.active] {
            magnitude *= section.magnitude_at(freq, sample_rate);
        }
    }
    if !update.peak_bypassed {
        magnitude *= update.peak.magnitude_at(freq, sample_rate);
    }
    if !update.high_cut_bypassed {
        for section in &update.high_cut.sections[..update.high_cut.active] {
            magnitude *= section.magnitude_at(freq, sample_rate);
        }
    }
    magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::Slope;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn settings_with_slopes(low: Slope, high: Slope) -> ChainSettings {
        ChainSettings {
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_q: 1.0,
            low_cut_freq: 100.0,
            high_cut_freq: 10_000.0,
            low_cut_slope: low,
            high_cut_slope: high,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }

    fn sine(freq: f32, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn test_active_stage_counts_per_ordinal() {
        for slope in [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48] {
            let mut chain = MonoChain::new();
            chain.update(&settings_with_slopes(slope, slope), SAMPLE_RATE);

            assert_eq!(chain.low_cut().active_stages(), slope.stages());
            assert_eq!(chain.high_cut().active_stages(), slope.stages());
        }
    }

    #[test]
    fn test_slope_change_reactivates_from_zero() {
        let mut chain = MonoChain::new();
        chain.update(
            &settings_with_slopes(Slope::Db48, Slope::Db12),
            SAMPLE_RATE,
        );
        assert_eq!(chain.low_cut().active_stages(), 4);

        // Dropping back down must bypass the upper stages again.
        chain.update(
            &settings_with_slopes(Slope::Db12, Slope::Db12),
            SAMPLE_RATE,
        );
        assert_eq!(chain.low_cut().active_stages(), 1);
    }

    #[test]
    fn test_bypassed_stage_is_exact_passthrough() {
        let mut stage = FilterStage::new(BiquadCoeffs::peak(SAMPLE_RATE, 1_000.0, 1.0, 12.0));
        stage.set_bypassed(true);

        let input = sine(440.0, 256);
        let mut block = input.clone();
        stage.process(&mut block);

        assert_eq!(block, input);
    }

    #[test]
    fn test_bypassed_banks_and_flat_peak_are_identity() {
        let mut settings = settings_with_slopes(Slope::Db48, Slope::Db48);
        settings.low_cut_bypassed = true;
        settings.high_cut_bypassed = true;
        settings.peak_bypassed = true;

        let mut chain = MonoChain::new();
        chain.update(&settings, SAMPLE_RATE);

        let input = sine(440.0, 256);
        let mut block = input.clone();
        chain.process(&mut block);

        assert_eq!(block, input);
    }

    #[test]
    fn test_peak_zero_gain_is_identity_within_tolerance() {
        let mut settings = settings_with_slopes(Slope::Db12, Slope::Db12);
        settings.low_cut_bypassed = true;
        settings.high_cut_bypassed = true;

        let mut chain = MonoChain::new();
        chain.update(&settings, SAMPLE_RATE);

        let input = sine(440.0, 512);
        let mut block = input.clone();
        chain.process(&mut block);

        for (processed, original) in block.iter().zip(input.iter()) {
            assert!((processed - original).abs() < 1e-5);
        }
    }

    #[test]
    fn test_coefficient_swap_keeps_delay_line() {
        let coeffs = BiquadCoeffs::lowpass(SAMPLE_RATE, 2_000.0, 0.707);
        let input = sine(440.0, 512);

        // One uninterrupted run.
        let mut reference_stage = FilterStage::new(coeffs);
        let mut reference = input.clone();
        reference_stage.process(&mut reference);

        // Same run with a mid-stream swap to identical coefficients.
        let mut stage = FilterStage::new(coeffs);
        let mut halves = input.clone();
        let (first, second) = halves.split_at_mut(256);
        stage.process(first);
        stage.set_coeffs(coeffs);
        stage.process(second);

        assert_eq!(halves, reference);
    }

    #[test]
    fn test_low_cut_attenuates_below_cutoff() {
        let mut chain = MonoChain::new();
        chain.update(
            &settings_with_slopes(Slope::Db24, Slope::Db12),
            SAMPLE_RATE,
        );

        // 100 Hz cut at 24 dB/oct: 25 Hz sits two octaves down.
        let low = chain.magnitude_at(25.0, SAMPLE_RATE);
        let mid = chain.magnitude_at(1_000.0, SAMPLE_RATE);

        let difference_db = 20.0 * (mid / low).log10();
        assert!(
            difference_db > 35.0,
            "only {} dB between passband and 25 Hz",
            difference_db
        );
    }

    #[test]
    fn test_response_magnitude_matches_chain() {
        let settings = settings_with_slopes(Slope::Db36, Slope::Db24);
        let mut chain = MonoChain::new();
        chain.update(&settings, SAMPLE_RATE);

        for freq in [50.0, 200.0, 1_000.0, 5_000.0, 15_000.0] {
            let from_chain = chain.magnitude_at(freq, SAMPLE_RATE);
            let from_settings = response_magnitude(&settings, SAMPLE_RATE, freq);
            assert!((from_chain - from_settings).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reset_clears_ringing() {
        let mut chain = MonoChain::new();
        chain.update(
            &settings_with_slopes(Slope::Db48, Slope::Db48),
            SAMPLE_RATE,
        );

        let mut block = sine(440.0, 512);
        chain.process(&mut block);
        chain.reset();

        let mut silence = vec![0.0; 64];
        chain.process(&mut silence);
        assert!(silence.iter().all(|s| s.abs() < 1e-6));
    }
}
