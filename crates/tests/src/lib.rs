//! Integration tests for the Clarion EQ engine
//!
//! These tests exercise the complete signal path across crate boundaries:
//! parameters → coefficient updates → chain processing → accumulators →
//! FIFOs → analyzer consumer.

#[cfg(test)]
mod eq_integration;
