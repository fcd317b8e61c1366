//! Live equalizer parameters and the per-block settings snapshot
//!
//! `EqParams` is the one piece of state genuinely shared between an
//! arbitrary writer (UI/configuration context) and the real-time reader.
//! Every parameter lives in its own atomic cell, so the real-time thread
//! can take a non-blocking snapshot of all values once per processing block
//! without ever observing a partially-written parameter set.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Steepness of a cut filter, in dB per octave.
///
/// The ordinal encodes how many cascaded 2nd-order sections are active:
/// ordinal N means N + 1 sections, i.e. a Butterworth filter of order
/// 2 * (N + 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slope {
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const fn ordinal(self) -> usize {
        match self {
            Slope::Db12 => 0,
            Slope::Db24 => 1,
            Slope::Db36 => 2,
            Slope::Db48 => 3,
        }
    }

    /// Number of active 2nd-order sections in a cut bank for this slope.
    pub const fn stages(self) -> usize {
        self.ordinal() + 1
    }

    /// Full filter order: 2, 4, 6 or 8.
    pub const fn filter_order(self) -> usize {
        2 * self.stages()
    }

    pub const fn db_per_octave(self) -> u32 {
        12 * self.stages() as u32
    }

    /// Inverse of [`Slope::ordinal`]. An ordinal outside 0..=3 is a
    /// programming-contract violation: the parameter store only ever holds
    /// ordinals written from a `Slope`.
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Slope::Db12,
            1 => Slope::Db24,
            2 => Slope::Db36,
            3 => Slope::Db48,
            _ => unreachable!("slope ordinal out of range: {ordinal}"),
        }
    }

    /// Parse a configuration-facing dB/octave figure.
    pub fn from_db_per_octave(db: u32) -> Option<Self> {
        match db {
            12 => Some(Slope::Db12),
            24 => Some(Slope::Db24),
            36 => Some(Slope::Db36),
            48 => Some(Slope::Db48),
            _ => None,
        }
    }
}

/// Immutable snapshot of every equalizer parameter.
///
/// Built once per processing block from [`EqParams`]; parameter writes that
/// land after the snapshot was taken are not observed until the next block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_q: f32,
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

/// Lock-free store of the live equalizer parameters.
///
/// Setters clamp to the valid range and raise the settings-changed latch;
/// they may be called from any thread. The real-time thread only ever
/// performs relaxed loads, so the store is safe to read from the audio
/// callback.
#[derive(Debug)]
pub struct EqParams {
    peak_freq: AtomicU32,
    peak_gain_db: AtomicU32,
    peak_q: AtomicU32,
    low_cut_freq: AtomicU32,
    high_cut_freq: AtomicU32,
    low_cut_slope: AtomicU8,
    high_cut_slope: AtomicU8,
    low_cut_bypassed: AtomicBool,
    peak_bypassed: AtomicBool,
    high_cut_bypassed: AtomicBool,
    changed: AtomicBool,
}

impl EqParams {
    /// Frequency range for every frequency parameter, in Hz.
    pub const FREQ_MIN: f32 = 20.0;
    pub const FREQ_MAX: f32 = 20_000.0;

    /// Peak gain range in decibels.
    pub const PEAK_GAIN_MIN: f32 = -24.0;
    pub const PEAK_GAIN_MAX: f32 = 24.0;

    /// Peak quality (Q) range.
    pub const PEAK_Q_MIN: f32 = 0.1;
    pub const PEAK_Q_MAX: f32 = 10.0;

    pub const DEFAULT_PEAK_FREQ: f32 = 750.0;
    pub const DEFAULT_LOW_CUT_FREQ: f32 = 20.0;
    pub const DEFAULT_HIGH_CUT_FREQ: f32 = 20_000.0;

    pub fn new() -> Self {
        Self {
            peak_freq: AtomicU32::new(Self::DEFAULT_PEAK_FREQ.to_bits()),
            peak_gain_db: AtomicU32::new(0.0f32.to_bits()),
            peak_q: AtomicU32::new(1.0f32.to_bits()),
            low_cut_freq: AtomicU32::new(Self::DEFAULT_LOW_CUT_FREQ.to_bits()),
            high_cut_freq: AtomicU32::new(Self::DEFAULT_HIGH_CUT_FREQ.to_bits()),
            low_cut_slope: AtomicU8::new(Slope::Db12.ordinal() as u8),
            high_cut_slope: AtomicU8::new(Slope::Db12.ordinal() as u8),
            low_cut_bypassed: AtomicBool::new(false),
            peak_bypassed: AtomicBool::new(false),
            high_cut_bypassed: AtomicBool::new(false),
            // Start latched so the first observer computes its initial view.
            changed: AtomicBool::new(true),
        }
    }

    pub fn set_peak_freq(&self, freq: f32) {
        let freq = freq.clamp(Self::FREQ_MIN, Self::FREQ_MAX);
        self.peak_freq.store(freq.to_bits(), Ordering::Relaxed);
        trace!("peak freq set to {} Hz", freq);
        self.mark_changed();
    }

    pub fn set_peak_gain_db(&self, gain_db: f32) {
        let gain_db = gain_db.clamp(Self::PEAK_GAIN_MIN, Self::PEAK_GAIN_MAX);
        self.peak_gain_db.store(gain_db.to_bits(), Ordering::Relaxed);
        trace!("peak gain set to {} dB", gain_db);
        self.mark_changed();
    }

    pub fn set_peak_q(&self, q: f32) {
        let q = q.clamp(Self::PEAK_Q_MIN, Self::PEAK_Q_MAX);
        self.peak_q.store(q.to_bits(), Ordering::Relaxed);
        trace!("peak Q set to {}", q);
        self.mark_changed();
    }

    pub fn set_low_cut_freq(&self, freq: f32) {
        let freq = freq.clamp(Self::FREQ_MIN, Self::FREQ_MAX);
        self.low_cut_freq.store(freq.to_bits(), Ordering::Relaxed);
        trace!("low cut freq set to {} Hz", freq);
        self.mark_changed();
    }

    pub fn set_high_cut_freq(&self, freq: f32) {
        let freq = freq.clamp(Self::FREQ_MIN, Self::FREQ_MAX);
        self.high_cut_freq.store(freq.to_bits(), Ordering::Relaxed);
        trace!("high cut freq set to {} Hz", freq);
        self.mark_changed();
    }

    pub fn set_low_cut_slope(&self, slope: Slope) {
        self.low_cut_slope
            .store(slope.ordinal() as u8, Ordering::Relaxed);
        trace!("low cut slope set to {} dB/oct", slope.db_per_octave());
        self.mark_changed();
    }

    pub fn set_high_cut_slope(&self, slope: Slope) {
        self.high_cut_slope
            .store(slope.ordinal() as u8, Ordering::Relaxed);
        trace!("high cut slope set to {} dB/oct", slope.db_per_octave());
        self.mark_changed();
    }

    pub fn set_low_cut_bypassed(&self, bypassed: bool) {
        self.low_cut_bypassed.store(bypassed, Ordering::Relaxed);
        self.mark_changed();
    }

    pub fn set_peak_bypassed(&self, bypassed: bool) {
        self.peak_bypassed.store(bypassed, Ordering::Relaxed);
        self.mark_changed();
    }

    pub fn set_high_cut_bypassed(&self, bypassed: bool) {
        self.high_cut_bypassed.store(bypassed, Ordering::Relaxed);
        self.mark_changed();
    }

    pub fn peak_freq(&self) -> f32 {
        f32::from_bits(self.peak_freq.load(Ordering::Relaxed))
    }

    pub fn peak_gain_db(&self) -> f32 {
        f32::from_bits(self.peak_gain_db.load(Ordering::Relaxed))
    }

    pub fn peak_q(&self) -> f32 {
        f32::from_bits(self.peak_q.load(Ordering::Relaxed))
    }

    pub fn low_cut_freq(&self) -> f32 {
        f32::from_bits(self.low_cut_freq.load(Ordering::Relaxed))
    }

    pub fn high_cut_freq(&self) -> f32 {
        f32::from_bits(self.high_cut_freq.load(Ordering::Relaxed))
    }

    pub fn low_cut_slope(&self) -> Slope {
        Slope::from_ordinal(self.low_cut_slope.load(Ordering::Relaxed))
    }

    pub fn high_cut_slope(&self) -> Slope {
        Slope::from_ordinal(self.high_cut_slope.load(Ordering::Relaxed))
    }

    /// Read every parameter exactly once and package the values.
    pub fn snapshot(&self) -> ChainSettings {
        ChainSettings {
            peak_freq: self.peak_freq(),
            peak_gain_db: self.peak_gain_db(),
            peak_q: self.peak_q(),
            low_cut_freq: self.low_cut_freq(),
            high_cut_freq: self.high_cut_freq(),
            low_cut_slope: self.low_cut_slope(),
            high_cut_slope: self.high_cut_slope(),
            low_cut_bypassed: self.low_cut_bypassed.load(Ordering::Relaxed),
            peak_bypassed: self.peak_bypassed.load(Ordering::Relaxed),
            high_cut_bypassed: self.high_cut_bypassed.load(Ordering::Relaxed),
        }
    }

    /// Consume the settings-changed latch.
    ///
    /// Returns `true` at most once per actual change: the latch is tested
    /// against `true` and atomically reset to `false` in one step, so an
    /// observer never misses a change and never recomputes for an unchanged
    /// store.
    pub fn take_changed(&self) -> bool {
        self.changed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }
}

impl Default for EqParams {
    fn default() -> Self {
        Self::new()
    }
}
