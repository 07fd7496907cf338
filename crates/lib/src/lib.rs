//! voxbuild-lib: orchestration core for multi-ABI native builds
//!
//! This crate drives a fixed chain of native dependency builds for every
//! requested Android ABI and turns the results into a distributable package:
//! - `validate`: process-wide preconditions, checked once before any build
//! - `toolchain`: per-target NDK compiler resolution
//! - `stage`: the five pipeline stages and their external actions
//! - `pipeline`: strictly ordered, resumable execution for one target
//! - `orchestrate`: bounded parallel fan-out over targets
//! - `artifact`: verification and staging of produced libraries
//! - `package`: bundling of staged artifacts with a manifest

pub mod artifact;
pub mod config;
pub mod consts;
pub mod orchestrate;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod toolchain;
pub mod util;
pub mod validate;
pub mod workspace;
