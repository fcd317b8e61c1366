//! Real-time audio infrastructure
//!
//! The producer side (processor + accumulators) runs on the audio thread
//! and never blocks, allocates or logs; the consumer side (analyzer task)
//! runs at its own cadence and only ever polls.

pub mod accumulator;
pub mod analyzer;
pub mod fifo;
pub mod processor;

pub use accumulator::{BlockAccumulator, BlockReceiver, BLOCK_FIFO_SLOTS};
pub use analyzer::{AnalyzerTask, SpectrumSink};
pub use fifo::{Consumer, Fifo, Producer};
pub use processor::{AnalyzerFeed, EqProcessor};
