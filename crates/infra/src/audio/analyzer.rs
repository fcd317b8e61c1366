//! Analyzer consumer context
//!
//! The non-real-time side of the handoff: a fixed-rate polling task that
//! drains completed sample blocks from both channel FIFOs and forwards them
//! to the spectral-analysis collaborator, plus the settings-changed latch
//! so that collaborator recomputes its cached response curve at most once
//! per actual parameter change.
//!
//! Nothing here blocks on the producer: an empty ring simply means the
//! cycle is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use clarion_core::domain::audio::AudioChannel;
use clarion_core::domain::params::{ChainSettings, EqParams};

use crate::audio::processor::AnalyzerFeed;

/// Seam to the spectral-analysis collaborator.
///
/// Implementations receive every block that survived the ring (oldest
/// first) and a snapshot whenever the parameters actually changed. They may
/// keep only the newest block if only the latest view matters.
pub trait SpectrumSink: Send {
    fn on_block(&mut self, channel: AudioChannel, samples: &[f32]);
    fn on_settings_changed(&mut self, settings: &ChainSettings);
}

/// Fixed-rate polling task draining the analyzer feed.
pub struct AnalyzerTask<S: SpectrumSink> {
    feed: AnalyzerFeed,
    params: Arc<EqParams>,
    sink: S,
    rate_hz: u32,
    scratch: Vec<f32>,
}

impl<S: SpectrumSink> AnalyzerTask<S> {
    pub fn new(feed: AnalyzerFeed, params: Arc<EqParams>, sink: S, rate_hz: u32) -> Self {
        let scratch = vec![0.0; feed.left.block_size()];
        Self {
            feed,
            params,
            sink,
            rate_hz,
            scratch,
        }
    }

    /// Run until `stop` flips to true (or its sender is dropped).
    ///
    /// Each tick performs a bounded amount of work: at most the ring
    /// capacity of blocks per channel can be waiting.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> S {
        info!(rate_hz = self.rate_hz, "analyzer task starting");

        let period = Duration::from_secs_f64(1.0 / self.rate_hz as f64);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(),
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        // Final drain so late blocks are not lost on shutdown.
        self.poll();
        debug!("analyzer task stopped");
        self.sink
    }

    /// One polling cycle: drain both channels, then check the latch.
    pub fn poll(&mut self) {
        while self.feed.left.pull(&mut self.scratch) {
            self.sink.on_block(AudioChannel::Left, &self.scratch);
        }
        while self.feed.right.pull(&mut self.scratch) {
            self.sink.on_block(AudioChannel::Right, &self.scratch);
        }

        if self.params.take_changed() {
            let settings = self.params.snapshot();
            self.sink.on_settings_changed(&settings);
        }
    }
}
