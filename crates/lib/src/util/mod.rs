//! Shared utilities.
//!
//! Content hashing for artifacts, plus helpers that fake an NDK and external
//! builds in tests.

pub mod hash;

#[cfg(test)]
pub mod testutil;
