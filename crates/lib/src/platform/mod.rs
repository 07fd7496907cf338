//! Host and target platform descriptions.
//!
//! `target` enumerates the Android ABIs we cross-compile for; `host` maps the
//! running machine onto the NDK's prebuilt toolchain directory names.

pub mod host;
pub mod target;

pub use host::{HostOs, current_host_tag, ndk_host_tag};
pub use target::{TargetId, UnknownTarget};
