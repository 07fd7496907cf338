use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::platform::TargetId;

/// Errors raised while resolving a target's toolchain.
///
/// These are scoped to one target: the orchestrator records them against that
/// target and carries on with the others.
#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("no NDK root configured")]
  NdkRootUnset,

  #[error("the NDK ships no prebuilt toolchain for this host")]
  UnsupportedHost,

  #[error("{tool} for {target} not found at {path}")]
  MissingExecutable {
    target: TargetId,
    tool: &'static str,
    path: PathBuf,
  },

  #[error("{tool} for {target} at {path} is not executable")]
  NotExecutable {
    target: TargetId,
    tool: &'static str,
    path: PathBuf,
  },

  #[error("NDK sysroot not found at {0}")]
  MissingSysroot(PathBuf),
}

/// The verified set of executables and flags used to cross-compile one target.
///
/// Only constructed by [`super::ToolchainResolver::resolve`], after every
/// referenced executable was found and checked to be executable. Fields are
/// private to the resolver so no other code can assemble an unchecked one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
  pub(super) target: TargetId,
  pub(super) api_level: u32,
  /// GNU host triple (`--host` for autotools).
  pub(super) triple: String,
  /// Clang target including the API level, e.g. `aarch64-linux-android21`.
  pub(super) clang_target: String,
  pub(super) cc: PathBuf,
  pub(super) cxx: PathBuf,
  pub(super) ar: PathBuf,
  pub(super) ranlib: PathBuf,
  pub(super) ld: PathBuf,
  pub(super) sysroot: PathBuf,
  pub(super) ndk_root: PathBuf,
  pub(super) cflags: Vec<String>,
  pub(super) ldflags: Vec<String>,
}

impl Toolchain {
  pub fn target(&self) -> TargetId {
    self.target
  }

  pub fn api_level(&self) -> u32 {
    self.api_level
  }

  /// GNU host triple (`--host` for autotools).
  pub fn triple(&self) -> &str {
    &self.triple
  }

  pub fn sysroot(&self) -> &Path {
    &self.sysroot
  }

  pub fn ndk_root(&self) -> &Path {
    &self.ndk_root
  }

  /// Flags shared by every C and C++ compile of this target.
  pub fn cflags(&self) -> &[String] {
    &self.cflags
  }

  /// Environment exported to every external build step of this target.
  pub fn env(&self) -> BTreeMap<String, String> {
    let cflags = self.cflags.join(" ");
    let mut env = BTreeMap::new();
    env.insert("CC".to_string(), self.cc.display().to_string());
    env.insert("CXX".to_string(), self.cxx.display().to_string());
    env.insert("AR".to_string(), self.ar.display().to_string());
    env.insert("RANLIB".to_string(), self.ranlib.display().to_string());
    env.insert("LD".to_string(), self.ld.display().to_string());
    env.insert("CFLAGS".to_string(), cflags.clone());
    env.insert("CXXFLAGS".to_string(), cflags);
    env.insert("LDFLAGS".to_string(), self.ldflags.join(" "));
    env.insert("ANDROID_NDK_HOME".to_string(), self.ndk_root.display().to_string());
    env.insert("TARGET_TRIPLE".to_string(), self.triple.clone());
    env
  }
}
