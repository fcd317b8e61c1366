//! Real-time plumbing for the Clarion equalizer engine
//!
//! Everything that crosses the real-time boundary lives here: the SPSC
//! block FIFO, the per-channel sample accumulators, the stereo processor
//! driven from the audio callback, and the analyzer polling task on the
//! consumer side.

pub mod audio;
