//! Core domain logic for the Clarion parametric equalizer engine.
//!
//! This crate is platform-agnostic: it defines the audio value types, the
//! lock-free parameter store, the filter coefficient factory and the
//! per-channel filter chains. The real-time plumbing (SPSC block FIFO,
//! sample accumulators, the stereo processor and the analyzer task) lives in
//! the `infra` crate.

pub mod domain;
