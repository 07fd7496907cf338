//! Implementation of the `voxb validate` command.

use std::process::ExitCode;

use anyhow::Result;

use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::validate::validate;

use crate::output::{OutputFormat, Tone, emit, print_json, print_stat};

/// Run the environment checks a build would run, and nothing else.
pub fn cmd_validate(config: &BuildConfig, format: OutputFormat) -> Result<ExitCode> {
  let env = validate(config)?;

  if format.is_json() {
    print_json(&env)?;
    return Ok(ExitCode::SUCCESS);
  }

  emit(Tone::Done, &format!("Environment OK (NDK {})", env.ndk_revision));
  let buildable: Vec<&str> = env.buildable.iter().map(|t| t.as_str()).collect();
  print_stat("Buildable", &buildable.join(", "));
  print_stat("Backend", config.math_backend.resolve().as_str());
  print_stat("Build type", config.build_type.as_str());
  for (target, why) in &env.dropped {
    emit(Tone::Warn, &format!("{} dropped: {}", target, why));
  }

  Ok(ExitCode::SUCCESS)
}
