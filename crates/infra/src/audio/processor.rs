//! Stereo equalizer processor
//!
//! The real-time producer context: once per processing block it snapshots
//! the parameter store, rebuilds the filter coefficients, updates both
//! channel chains identically, filters the block in place, and feeds the
//! processed samples into the per-channel accumulators. Everything here is
//! O(block size) with no locks, no allocation and no syscalls.

use std::sync::Arc;

use tracing::info;

use clarion_core::domain::audio::{AudioError, Result, StreamConfig};
use clarion_core::domain::chain::{ChainUpdate, MonoChain};
use clarion_core::domain::params::EqParams;

use crate::audio::accumulator::{BlockAccumulator, BlockReceiver};

/// Consumer-side handles for both channels' completed blocks.
pub struct AnalyzerFeed {
    pub left: BlockReceiver,
    pub right: BlockReceiver,
}

/// Two independent mono chains plus the analyzer taps.
pub struct EqProcessor {
    params: Arc<EqParams>,
    left: MonoChain,
    right: MonoChain,
    left_tap: Option<BlockAccumulator>,
    right_tap: Option<BlockAccumulator>,
    sample_rate: f32,
}

impl EqProcessor {
    pub fn new(params: Arc<EqParams>) -> Self {
        Self {
            params,
            left: MonoChain::new(),
            right: MonoChain::new(),
            left_tap: None,
            right_tap: None,
            sample_rate: 0.0,
        }
    }

    /// Bind the processor to a stream configuration.
    ///
    /// Must be called before the first `process`. Resets all filter state,
    /// applies the current parameter snapshot so the very first block is
    /// already filtered, and builds fresh analyzer taps sized for
    /// `analyzer_block` samples. Returns the consumer-side feed.
    pub fn prepare(&mut self, config: &StreamConfig, analyzer_block: usize) -> Result<AnalyzerFeed> {
        if config.buffer_size == 0 {
            return Err(AudioError::InvalidConfiguration(
                "buffer_size must be > 0".to_string(),
            ));
        }
        if analyzer_block == 0 {
            return Err(AudioError::InvalidConfiguration(
                "analyzer block size must be > 0".to_string(),
            ));
        }

        self.sample_rate = config.sample_rate.hz() as f32;
        self.left.reset();
        self.right.reset();

        let settings = self.params.snapshot();
        let update = ChainUpdate::from_settings(&settings, self.sample_rate);
        self.left.apply(&update);
        self.right.apply(&update);

        let (left_tap, left_feed) = BlockAccumulator::prepare(analyzer_block);
        let (right_tap, right_feed) = BlockAccumulator::prepare(analyzer_block);
        self.left_tap = Some(left_tap);
        self.right_tap = Some(right_tap);

        info!(
            sample_rate = config.sample_rate.hz(),
            buffer_size = config.buffer_size,
            analyzer_block,
            "EQ processor prepared"
        );

        Ok(AnalyzerFeed {
            left: left_feed,
            right: right_feed,
        })
    }

    /// Process one stereo block in place.
    ///
    /// Called from the real-time thread. The snapshot taken here is the
    /// only view of the parameters for this block; concurrent writes become
    /// visible on the next call.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert!(self.sample_rate > 0.0, "process called before prepare");

        let settings = self.params.snapshot();
        let update = ChainUpdate::from_settings(&settings, self.sample_rate);
        self.left.apply(&update);
        self.right.apply(&update);

        self.left.process(left);
        self.right.process(right);

        if let Some(tap) = &mut self.left_tap {
            tap.update(left);
        }
        if let Some(tap) = &mut self.right_tap {
            tap.update(right);
        }
    }

    /// Clear both chains' filter state without touching coefficients.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn params(&self) -> &Arc<EqParams> {
        &self.params
    }

    /// Active stage counts (low-cut bank, high-cut bank) of the left chain.
    ///
    /// Both chains always carry identical configurations; this is exposed
    /// for assertions and diagnostics.
    pub fn active_cut_stages(&self) -> (usize, usize) {
        (
            self.left.low_cut().active_stages(),
            self.left.high_cut().active_stages(),
        )
    }
}
