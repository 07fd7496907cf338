//! Per-target NDK toolchain resolution.
//!
//! Each Android ABI maps to an API-suffixed clang driver in the NDK's LLVM
//! prebuilt directory (`<prefix><api>-clang`). Resolution substitutes the NDK
//! root, host tag and API level into that template, checks every executable
//! and returns a [`Toolchain`]. The resolver holds no mutable state and can be
//! shared across concurrently running target pipelines.

mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::BuildConfig;
use crate::platform::{TargetId, current_host_tag};

pub use types::{Toolchain, ToolchainError};

#[derive(Debug, Clone)]
pub struct ToolchainResolver {
  ndk_root: PathBuf,
  host_tag: String,
  api_levels: BTreeMap<TargetId, u32>,
}

impl ToolchainResolver {
  pub fn new(ndk_root: impl Into<PathBuf>, host_tag: impl Into<String>) -> Self {
    Self {
      ndk_root: ndk_root.into(),
      host_tag: host_tag.into(),
      api_levels: BTreeMap::new(),
    }
  }

  /// Build a resolver from the run configuration, detecting the host tag when
  /// the config does not pin one.
  pub fn from_config(config: &BuildConfig) -> Result<Self, ToolchainError> {
    let ndk_root = config.ndk_root.clone().ok_or(ToolchainError::NdkRootUnset)?;
    let host_tag = match &config.host_tag {
      Some(tag) => tag.clone(),
      None => current_host_tag().ok_or(ToolchainError::UnsupportedHost)?,
    };
    let levels = TargetId::ALL.iter().map(|t| (*t, config.api_level(*t))).collect();
    Ok(Self::new(ndk_root, host_tag).with_api_levels(levels))
  }

  pub fn with_api_levels(mut self, api_levels: BTreeMap<TargetId, u32>) -> Self {
    self.api_levels = api_levels;
    self
  }

  pub fn ndk_root(&self) -> &Path {
    &self.ndk_root
  }

  pub fn api_level(&self, target: TargetId) -> u32 {
    self
      .api_levels
      .get(&target)
      .copied()
      .unwrap_or(crate::consts::DEFAULT_API_LEVEL)
  }

  /// `toolchains/llvm/prebuilt/<host>` under the NDK root.
  pub fn prebuilt_dir(&self) -> PathBuf {
    self
      .ndk_root
      .join("toolchains")
      .join("llvm")
      .join("prebuilt")
      .join(&self.host_tag)
  }

  /// Path of the target's C compiler driver, whether or not it exists.
  pub fn compiler_path(&self, target: TargetId) -> PathBuf {
    self.bin_dir().join(format!("{}-clang", self.clang_target(target)))
  }

  fn bin_dir(&self) -> PathBuf {
    self.prebuilt_dir().join("bin")
  }

  fn clang_target(&self, target: TargetId) -> String {
    format!("{}{}", target.clang_prefix(), self.api_level(target))
  }

  /// Resolve and verify the toolchain for one target.
  pub fn resolve(&self, target: TargetId) -> Result<Toolchain, ToolchainError> {
    let bin = self.bin_dir();
    let clang_target = self.clang_target(target);

    let cc = bin.join(format!("{}-clang", clang_target));
    let cxx = bin.join(format!("{}-clang++", clang_target));
    let ar = bin.join("llvm-ar");
    let ranlib = bin.join("llvm-ranlib");
    let ld = bin.join("ld.lld");

    for (tool, path) in [
      ("C compiler", &cc),
      ("C++ compiler", &cxx),
      ("archiver", &ar),
      ("ranlib", &ranlib),
      ("linker", &ld),
    ] {
      check_executable(target, tool, path)?;
    }

    let sysroot = self.prebuilt_dir().join("sysroot");
    if !sysroot.is_dir() {
      return Err(ToolchainError::MissingSysroot(sysroot));
    }

    let mut cflags: Vec<String> = vec!["-fPIC".to_string()];
    cflags.extend(target.cflags().iter().map(|f| f.to_string()));

    debug!(target = %target, cc = %cc.display(), "resolved toolchain");

    Ok(Toolchain {
      target,
      api_level: self.api_level(target),
      triple: target.host_triple().to_string(),
      clang_target,
      cc,
      cxx,
      ar,
      ranlib,
      ld,
      sysroot,
      ndk_root: self.ndk_root.clone(),
      cflags,
      ldflags: vec!["-llog".to_string(), "-static-libstdc++".to_string()],
    })
  }
}

fn check_executable(target: TargetId, tool: &'static str, path: &Path) -> Result<(), ToolchainError> {
  let metadata = match std::fs::metadata(path) {
    Ok(m) if m.is_file() => m,
    _ => {
      return Err(ToolchainError::MissingExecutable {
        target,
        tool,
        path: path.to_path_buf(),
      });
    }
  };

  if !is_executable(&metadata) {
    return Err(ToolchainError::NotExecutable {
      target,
      tool,
      path: path.to_path_buf(),
    });
  }
  Ok(())
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
  use std::os::unix::fs::PermissionsExt;
  metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
  true
}
