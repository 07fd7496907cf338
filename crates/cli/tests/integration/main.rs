//! CLI integration tests for voxb.

mod build_tests;
mod common;
mod package_tests;
mod validate_tests;
