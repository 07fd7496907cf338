//! Process-wide precondition checks.
//!
//! [`validate`] runs once per invocation, before any workspace is touched. A
//! broken NDK or a missing tool invalidates every target equally, so the first
//! unmet precondition aborts the whole run. The only target-scoped leniency is
//! `force`: a target whose compiler is absent is dropped instead.
//!
//! Validation never writes to the filesystem.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BuildConfig, MathBackend};
use crate::consts::{MIN_NDK_MAJOR, NDK_DESCRIPTOR, PUBLIC_HEADER};
use crate::platform::TargetId;
use crate::toolchain::{ToolchainError, ToolchainResolver};

#[derive(Debug, Error)]
pub enum EnvironmentError {
  #[error("no NDK root configured (set --ndk-root or ANDROID_NDK_HOME)")]
  NdkRootUnset,

  #[error("NDK root does not exist: {0}")]
  NdkRootMissing(PathBuf),

  #[error("required tool '{0}' not found on the search path")]
  MissingTool(String),

  #[error("NDK descriptor not found: {0}")]
  DescriptorMissing(PathBuf),

  #[error("NDK descriptor {path} is unreadable: {message}")]
  DescriptorInvalid { path: PathBuf, message: String },

  #[error("NDK {found} is too old (need r{minimum} or newer)")]
  NdkTooOld { found: String, minimum: u32 },

  #[error("the NDK ships no prebuilt toolchain for this host")]
  UnsupportedHost,

  #[error("compiler for {target} not found at {path}")]
  CompilerMissing { target: TargetId, path: PathBuf },

  #[error("target library sources not found: {0}")]
  SourceMissing(PathBuf),

  #[error("math backend {backend} cannot build {target}")]
  MathBackendUnsupported { backend: MathBackend, target: TargetId },

  #[error("math backend mkl needs mkl_root pointing at an existing directory")]
  MklRootMissing,
}

/// What validation established about the environment.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedEnvironment {
  pub ndk_revision: String,
  /// Targets that passed every check and will be built.
  pub buildable: Vec<TargetId>,
  /// Targets dropped under `force`, with the reason.
  pub dropped: Vec<(TargetId, String)>,
}

/// Check every global precondition, in order, stopping at the first failure.
pub fn validate(config: &BuildConfig) -> Result<ValidatedEnvironment, EnvironmentError> {
  let ndk_root = config.ndk_root.as_deref().ok_or(EnvironmentError::NdkRootUnset)?;
  if !ndk_root.is_dir() {
    return Err(EnvironmentError::NdkRootMissing(ndk_root.to_path_buf()));
  }
  debug!(ndk_root = %ndk_root.display(), "ndk root present");

  for tool in &config.required_tools {
    let found = which::which_in(tool, config.search_path.as_ref(), ndk_root)
      .map_err(|_| EnvironmentError::MissingTool(tool.clone()))?;
    debug!(tool = %tool, path = %found.display(), "tool found");
  }

  let ndk_revision = read_ndk_revision(ndk_root)?;
  info!(revision = %ndk_revision, "using NDK");

  let resolver = ToolchainResolver::from_config(config).map_err(|e| match e {
    ToolchainError::NdkRootUnset => EnvironmentError::NdkRootUnset,
    _ => EnvironmentError::UnsupportedHost,
  })?;

  let mut buildable = Vec::new();
  let mut dropped = Vec::new();
  for target in config.build_targets() {
    let compiler = resolver.compiler_path(target);
    if compiler.is_file() {
      buildable.push(target);
      continue;
    }
    if config.force {
      warn!(target = %target, path = %compiler.display(), "compiler missing, dropping target");
      dropped.push((target, format!("compiler not found at {}", compiler.display())));
    } else {
      return Err(EnvironmentError::CompilerMissing { target, path: compiler });
    }
  }

  let header = config.source_dir.join(PUBLIC_HEADER);
  if !header.is_file() {
    return Err(EnvironmentError::SourceMissing(config.source_dir.clone()));
  }

  check_math_backend(config, &buildable)?;

  info!(
    buildable = buildable.len(),
    dropped = dropped.len(),
    "environment validated"
  );

  Ok(ValidatedEnvironment {
    ndk_revision,
    buildable,
    dropped,
  })
}

fn read_ndk_revision(ndk_root: &Path) -> Result<String, EnvironmentError> {
  let path = ndk_root.join(NDK_DESCRIPTOR);
  if !path.is_file() {
    return Err(EnvironmentError::DescriptorMissing(path));
  }
  let content = std::fs::read_to_string(&path).map_err(|e| EnvironmentError::DescriptorInvalid {
    path: path.clone(),
    message: e.to_string(),
  })?;

  let revision = parse_revision(&content).ok_or_else(|| EnvironmentError::DescriptorInvalid {
    path: path.clone(),
    message: "no Pkg.Revision entry".to_string(),
  })?;

  let major = revision
    .split('.')
    .next()
    .and_then(|m| m.parse::<u32>().ok())
    .ok_or_else(|| EnvironmentError::DescriptorInvalid {
      path: path.clone(),
      message: format!("malformed revision '{}'", revision),
    })?;

  if major < MIN_NDK_MAJOR {
    return Err(EnvironmentError::NdkTooOld {
      found: revision,
      minimum: MIN_NDK_MAJOR,
    });
  }
  Ok(revision)
}

/// Extract `Pkg.Revision` from a `source.properties` document.
fn parse_revision(content: &str) -> Option<String> {
  content.lines().find_map(|line| {
    let (key, value) = line.split_once('=')?;
    (key.trim() == "Pkg.Revision").then(|| value.trim().to_string())
  })
}

fn check_math_backend(config: &BuildConfig, targets: &[TargetId]) -> Result<(), EnvironmentError> {
  if config.math_backend.resolve() != MathBackend::Mkl {
    return Ok(());
  }
  if let Some(target) = targets.iter().find(|t| !t.is_x86_family()) {
    return Err(EnvironmentError::MathBackendUnsupported {
      backend: MathBackend::Mkl,
      target: *target,
    });
  }
  match &config.mkl_root {
    Some(root) if root.is_dir() => Ok(()),
    _ => Err(EnvironmentError::MklRootMissing),
  }
}
