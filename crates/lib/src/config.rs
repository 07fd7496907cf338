//! Run configuration.
//!
//! A [`BuildConfig`] is assembled once at process start (defaults, then an
//! optional TOML file, then command-line overrides) and afterwards only ever
//! borrowed. Nothing below the CLI reads environment variables; the caller
//! snapshots whatever ambient state is needed (e.g. `PATH`) into the config.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_API_LEVEL;
use crate::platform::TargetId;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// CMake build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildType {
  Debug,
  #[default]
  Release,
  RelWithDebInfo,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "Debug",
      Self::Release => "Release",
      Self::RelWithDebInfo => "RelWithDebInfo",
    }
  }

  /// Optimization flags added to every C/C++ compile for this configuration.
  pub fn c_flags(&self) -> &'static str {
    match self {
      Self::Debug => "-g -O0",
      Self::Release => "-O3 -DNDEBUG",
      Self::RelWithDebInfo => "-O2 -g",
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for BuildType {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Debug" => Ok(Self::Debug),
      "Release" => Ok(Self::Release),
      "RelWithDebInfo" => Ok(Self::RelWithDebInfo),
      other => Err(ConfigError::Invalid(format!(
        "unknown build type '{}' (expected Debug, Release or RelWithDebInfo)",
        other
      ))),
    }
  }
}

/// BLAS provider for the `mathlib` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathBackend {
  #[default]
  Auto,
  OpenBlas,
  Mkl,
}

impl MathBackend {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Auto => "auto",
      Self::OpenBlas => "openblas",
      Self::Mkl => "mkl",
    }
  }

  /// Backend actually used once `auto` has been decided.
  pub fn resolve(self) -> MathBackend {
    match self {
      Self::Auto => Self::OpenBlas,
      other => other,
    }
  }
}

impl fmt::Display for MathBackend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for MathBackend {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "auto" => Ok(Self::Auto),
      "openblas" => Ok(Self::OpenBlas),
      "mkl" => Ok(Self::Mkl),
      other => Err(ConfigError::Invalid(format!(
        "unknown math backend '{}' (expected auto, openblas or mkl)",
        other
      ))),
    }
  }
}

/// Everything a build invocation needs to know, resolved up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  /// Android NDK root (the directory holding `source.properties`).
  pub ndk_root: Option<PathBuf>,
  /// Parent of the per-target workspace partitions.
  pub workspace_root: PathBuf,
  /// Canonical output tree, `<output_root>/<target>/<artifact>`.
  pub output_root: PathBuf,
  /// Directory the final package is written to.
  pub package_dir: PathBuf,
  /// Source tree of the target library.
  pub source_dir: PathBuf,
  /// Requested targets. Empty means every known target.
  pub targets: Vec<TargetId>,
  /// Targets explicitly left out of this run; reported as skipped.
  pub exclude: Vec<TargetId>,
  /// Per-target minimum API level overrides.
  pub api_levels: BTreeMap<TargetId, u32>,
  /// Override for the NDK prebuilt host directory (detected when unset).
  pub host_tag: Option<String>,
  pub math_backend: MathBackend,
  pub mkl_root: Option<PathBuf>,
  pub build_type: BuildType,
  /// Maximum number of target pipelines running at once.
  pub jobs: usize,
  /// `-j` passed to the external make invocations.
  pub make_jobs: usize,
  /// Executables that must be resolvable on the search path.
  pub required_tools: Vec<String>,
  /// Search path used to resolve `required_tools`, captured at startup.
  #[serde(skip)]
  pub search_path: Option<OsString>,
  pub package_name: String,
  pub package_version: String,
  pub install_prefix: PathBuf,
  /// Check the produced library's exported API after collecting it.
  pub run_tests: bool,
  /// Copy collected artifacts and the public header into `install_prefix`.
  pub install: bool,
  /// Drop targets with a missing compiler instead of failing the run.
  pub force: bool,
  /// Wipe each target's workspace before its pipeline starts.
  pub clean: bool,
  /// Debug-level logging, including every line external tools print.
  pub verbose: bool,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      ndk_root: None,
      workspace_root: PathBuf::from("build/workspace"),
      output_root: PathBuf::from("build/jniLibs"),
      package_dir: PathBuf::from("build/dist"),
      source_dir: PathBuf::from("src"),
      targets: Vec::new(),
      exclude: Vec::new(),
      api_levels: BTreeMap::new(),
      host_tag: None,
      math_backend: MathBackend::default(),
      mkl_root: None,
      build_type: BuildType::default(),
      jobs: default_jobs(),
      make_jobs: default_jobs(),
      required_tools: vec!["cmake".to_string(), "make".to_string(), "git".to_string()],
      search_path: None,
      package_name: "vosk-android".to_string(),
      package_version: "0.3.45".to_string(),
      install_prefix: PathBuf::from("build/install"),
      run_tests: false,
      install: false,
      force: false,
      clean: false,
      verbose: false,
    }
  }
}

fn default_jobs() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

impl BuildConfig {
  /// Parse a TOML document on top of the defaults.
  pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: origin.to_path_buf(),
      source,
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content, path)
  }

  /// Reject values no run could succeed with.
  pub fn check(&self) -> Result<(), ConfigError> {
    if self.jobs == 0 {
      return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
    }
    if self.make_jobs == 0 {
      return Err(ConfigError::Invalid("make_jobs must be at least 1".to_string()));
    }
    if self.package_name.trim().is_empty() || self.package_version.trim().is_empty() {
      return Err(ConfigError::Invalid(
        "package_name and package_version must not be empty".to_string(),
      ));
    }
    if let Some((target, level)) = self.api_levels.iter().find(|(_, level)| **level < DEFAULT_API_LEVEL) {
      return Err(ConfigError::Invalid(format!(
        "api level {} for {} is below the supported minimum {}",
        level, target, DEFAULT_API_LEVEL
      )));
    }
    Ok(())
  }

  /// Targets named by the user (or all known ones), in canonical order, deduplicated.
  pub fn requested_targets(&self) -> Vec<TargetId> {
    let mut targets = if self.targets.is_empty() {
      TargetId::ALL.to_vec()
    } else {
      self.targets.clone()
    };
    targets.sort();
    targets.dedup();
    targets
  }

  /// Requested targets that will actually be built (exclusions removed).
  pub fn build_targets(&self) -> Vec<TargetId> {
    self
      .requested_targets()
      .into_iter()
      .filter(|t| !self.exclude.contains(t))
      .collect()
  }

  /// Requested targets the user explicitly excluded.
  pub fn excluded_targets(&self) -> Vec<TargetId> {
    self
      .requested_targets()
      .into_iter()
      .filter(|t| self.exclude.contains(t))
      .collect()
  }

  pub fn api_level(&self, target: TargetId) -> u32 {
    self.api_levels.get(&target).copied().unwrap_or(DEFAULT_API_LEVEL)
  }
}
