//! Per-channel sample accumulator
//!
//! Collects the scalar sample stream of one audio channel into fixed-size
//! blocks and hands completed blocks to the analyzer side through the SPSC
//! FIFO. Runs on the real-time thread: no locks, no allocations, no
//! logging. When the ring is full a completed block is dropped rather than
//! blocking the producer; drops are counted so the non-real-time side can
//! observe them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::fifo::{Consumer, Fifo, Producer};

/// Ring capacity in completed blocks.
pub const BLOCK_FIFO_SLOTS: usize = 30;

/// Producer-side accumulator for one channel.
pub struct BlockAccumulator {
    block: Vec<f32>,
    cursor: usize,
    producer: Producer<Vec<f32>>,
    dropped: Arc<AtomicU64>,
}

/// Consumer-side handle pulling completed blocks for one channel.
pub struct BlockReceiver {
    consumer: Consumer<Vec<f32>>,
    dropped: Arc<AtomicU64>,
    block_size: usize,
}

impl BlockAccumulator {
    /// Set up accumulation for `block_size`-sample blocks.
    ///
    /// Allocates the scratch block and the 30-slot ring up front; nothing
    /// allocates after this point. Reconfiguration means building a fresh
    /// pair; the old producer half must no longer be fed.
    pub fn prepare(block_size: usize) -> (Self, BlockReceiver) {
        assert!(block_size > 0, "block size must be non-zero");

        let (producer, consumer) = Fifo::split(BLOCK_FIFO_SLOTS, vec![0.0f32; block_size]);
        let dropped = Arc::new(AtomicU64::new(0));

        (
            Self {
                block: vec![0.0; block_size],
                cursor: 0,
                producer,
                dropped: Arc::clone(&dropped),
            },
            BlockReceiver {
                consumer,
                dropped,
                block_size,
            },
        )
    }

    /// Append one processing block's worth of samples, in order.
    ///
    /// Whenever the cursor reaches the block size the completed block is
    /// flushed into the ring and accumulation restarts. A full ring drops
    /// the completed block; samples are never dropped mid-block.
    pub fn update(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.block[self.cursor] = sample;
            self.cursor += 1;

            if self.cursor == self.block.len() {
                if !self.producer.push(&self.block) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                self.cursor = 0;
            }
        }
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }
}

impl BlockReceiver {
    /// Number of completed blocks ready to pull.
    pub fn blocks_available(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_ready(&self) -> bool {
        !self.consumer.is_empty()
    }

    /// Pull the oldest completed block into `out`.
    ///
    /// Returns `false` when no block is available. `out` is resized to the
    /// block size on first use and reused afterwards.
    pub fn pull(&mut self, out: &mut Vec<f32>) -> bool {
        self.consumer.pull(out)
    }

    /// Completed blocks discarded because the ring was full.
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
