//! Implementation of the `voxb package` command.

use std::process::ExitCode;

use anyhow::Result;

use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::package::{Package, Packager};

use crate::output::{OutputFormat, Tone, emit, format_size, print_json, print_stat};

/// Package the current output tree without building anything.
pub fn cmd_package(config: &BuildConfig, format: OutputFormat) -> Result<ExitCode> {
  let package = Packager::from_config(config).package(&config.output_root, &config.build_targets())?;

  if format.is_json() {
    print_json(&package.manifest)?;
  } else {
    print_package(&package);
  }
  Ok(ExitCode::SUCCESS)
}

pub(super) fn print_package(package: &Package) {
  let manifest = &package.manifest;
  emit(Tone::Done, &format!(
    "Packaged {} {} ({} target(s))",
    manifest.name,
    manifest.version,
    manifest.included.len()
  ));
  print_stat("Path", &package.path.display().to_string());
  for entry in &manifest.artifacts {
    print_stat(entry.target.as_str(), &format_size(entry.size));
  }
  if manifest.is_partial() {
    let missing: Vec<&str> = manifest.missing.iter().map(|t| t.as_str()).collect();
    emit(Tone::Warn, &format!("Package is missing: {}", missing.join(", ")));
  }
}
