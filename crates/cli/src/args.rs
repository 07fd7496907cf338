//! Build options shared by every subcommand and their layering onto the
//! config file.
//!
//! Precedence, lowest first: built-in defaults, the TOML file given with
//! `--config`, then flags and their environment fallbacks.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Args;

use voxbuild_lib::config::{BuildConfig, BuildType, MathBackend};
use voxbuild_lib::platform::TargetId;

/// Last-resort NDK location, honored when nothing else names one.
const ANDROID_NDK_HOME: &str = "ANDROID_NDK_HOME";

#[derive(Debug, Default, Args)]
pub struct BuildArgs {
  /// Android NDK root
  #[arg(long, env = "VOXBUILD_NDK_ROOT", global = true)]
  pub ndk_root: Option<PathBuf>,

  /// Root of the per-target build workspaces
  #[arg(long, env = "VOXBUILD_WORKSPACE", global = true)]
  pub workspace: Option<PathBuf>,

  /// Canonical output tree (<output>/<abi>/libvosk.so)
  #[arg(long, env = "VOXBUILD_OUTPUT", global = true)]
  pub output_root: Option<PathBuf>,

  /// Directory the package archive is written to
  #[arg(long, global = true)]
  pub package_dir: Option<PathBuf>,

  /// Source tree of the target library
  #[arg(long, global = true)]
  pub source_dir: Option<PathBuf>,

  /// Prefix for --install
  #[arg(long, global = true)]
  pub install_prefix: Option<PathBuf>,

  /// NDK prebuilt host directory (detected by default)
  #[arg(long, global = true)]
  pub host_tag: Option<String>,

  /// Target ABI to build (repeatable; default: all)
  #[arg(short, long = "target", value_name = "ABI", global = true)]
  pub targets: Vec<TargetId>,

  /// Target ABI to skip (repeatable)
  #[arg(long, value_name = "ABI", global = true)]
  pub exclude: Vec<TargetId>,

  /// Minimum API level for one ABI
  #[arg(long = "api-level", value_name = "ABI=LEVEL", value_parser = parse_api_level, global = true)]
  pub api_levels: Vec<(TargetId, u32)>,

  /// BLAS provider: auto, openblas or mkl
  #[arg(long, global = true)]
  pub math_backend: Option<MathBackend>,

  /// Intel MKL installation (with --math-backend mkl)
  #[arg(long, global = true)]
  pub mkl_root: Option<PathBuf>,

  /// Debug, Release or RelWithDebInfo
  #[arg(long, global = true)]
  pub build_type: Option<BuildType>,

  /// Targets built in parallel
  #[arg(short, long, global = true)]
  pub jobs: Option<usize>,

  /// Parallelism passed to make
  #[arg(long, global = true)]
  pub make_jobs: Option<usize>,

  /// Check exported symbols of each built library
  #[arg(long, global = true)]
  pub run_tests: bool,

  /// Copy libraries and headers to the install prefix
  #[arg(long, global = true)]
  pub install: bool,

  /// Skip targets whose compiler is missing instead of failing
  #[arg(long, global = true)]
  pub force: bool,

  /// Wipe each target's workspace before building
  #[arg(long, global = true)]
  pub clean: bool,
}

impl BuildArgs {
  /// Overlay the flags that were given onto `config`.
  pub fn apply(&self, config: &mut BuildConfig) {
    fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
      if let Some(v) = value {
        *slot = v.clone();
      }
    }

    if self.ndk_root.is_some() {
      config.ndk_root = self.ndk_root.clone();
    }
    if self.host_tag.is_some() {
      config.host_tag = self.host_tag.clone();
    }
    if self.mkl_root.is_some() {
      config.mkl_root = self.mkl_root.clone();
    }
    set(&mut config.workspace_root, &self.workspace);
    set(&mut config.output_root, &self.output_root);
    set(&mut config.package_dir, &self.package_dir);
    set(&mut config.source_dir, &self.source_dir);
    set(&mut config.install_prefix, &self.install_prefix);
    set(&mut config.math_backend, &self.math_backend);
    set(&mut config.build_type, &self.build_type);
    set(&mut config.jobs, &self.jobs);
    set(&mut config.make_jobs, &self.make_jobs);

    if !self.targets.is_empty() {
      config.targets = self.targets.clone();
    }
    config.exclude.extend(self.exclude.iter().copied());
    config.api_levels.extend(self.api_levels.iter().copied());

    config.run_tests |= self.run_tests;
    config.install |= self.install;
    config.force |= self.force;
    config.clean |= self.clean;
  }
}

/// Build the run configuration once, at startup.
///
/// `ndk_home` and `path` are the process's `ANDROID_NDK_HOME` and `PATH`.
pub fn load_config(
  file: Option<&Path>,
  args: &BuildArgs,
  verbose: bool,
  ndk_home: Option<OsString>,
  path: Option<OsString>,
) -> Result<BuildConfig> {
  let mut config = match file {
    Some(file) => {
      BuildConfig::load(file).with_context(|| format!("Failed to load config from {}", file.display()))?
    }
    None => BuildConfig::default(),
  };

  args.apply(&mut config);
  if config.ndk_root.is_none() {
    config.ndk_root = ndk_home.filter(|v| !v.is_empty()).map(PathBuf::from);
  }
  config.search_path = path;
  config.verbose |= verbose;

  config.check().context("Invalid configuration")?;
  Ok(config)
}

/// Same as [`load_config`], reading the two variables from the environment.
pub fn load_config_from_env(file: Option<&Path>, args: &BuildArgs, verbose: bool) -> Result<BuildConfig> {
  load_config(
    file,
    args,
    verbose,
    std::env::var_os(ANDROID_NDK_HOME),
    std::env::var_os("PATH"),
  )
}

fn parse_api_level(s: &str) -> Result<(TargetId, u32)> {
  let (abi, level) = s
    .split_once('=')
    .ok_or_else(|| anyhow!("expected ABI=LEVEL, got '{}'", s))?;
  let target: TargetId = abi.parse()?;
  let level: u32 = level.parse().with_context(|| format!("invalid API level '{}'", level))?;
  Ok((target, level))
}
