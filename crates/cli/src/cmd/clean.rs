//! Implementation of the `voxb clean` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::orchestrate::BuildOrchestrator;

use crate::output::{OutputFormat, Tone, emit, print_json};

/// Remove the workspace partitions of the requested targets.
pub fn cmd_clean(config: BuildConfig, format: OutputFormat) -> Result<ExitCode> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let cleaned = rt
    .block_on(BuildOrchestrator::native(config).clean())
    .context("Clean failed")?;

  if format.is_json() {
    print_json(&cleaned)?;
  } else if cleaned.is_empty() {
    emit(Tone::Note, "Nothing to clean");
  } else {
    let names: Vec<&str> = cleaned.iter().map(|t| t.as_str()).collect();
    emit(Tone::Done, &format!("Cleaned {}", names.join(", ")));
  }
  Ok(ExitCode::SUCCESS)
}
