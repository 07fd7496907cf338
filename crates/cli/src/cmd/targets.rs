//! Implementation of the `voxb targets` command.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::platform::TargetId;

use crate::output::{OutputFormat, Tone, emit, print_json, print_stat};

#[derive(Serialize)]
struct TargetInfo {
  target: TargetId,
  triple: &'static str,
  compiler: String,
  api_level: u32,
  selected: bool,
}

pub fn cmd_targets(config: &BuildConfig, format: OutputFormat) -> Result<ExitCode> {
  let selected = config.build_targets();
  let infos: Vec<TargetInfo> = TargetId::ALL
    .iter()
    .map(|t| TargetInfo {
      target: *t,
      triple: t.host_triple(),
      compiler: format!("{}{}-clang", t.clang_prefix(), config.api_level(*t)),
      api_level: config.api_level(*t),
      selected: selected.contains(t),
    })
    .collect();

  if format.is_json() {
    print_json(&infos)?;
    return Ok(ExitCode::SUCCESS);
  }

  for info in &infos {
    let marker = if info.selected { "" } else { " (not selected)" };
    emit(Tone::Note, &format!("{}{}", info.target, marker));
    print_stat("Triple", info.triple);
    print_stat("Compiler", &info.compiler);
    print_stat("API level", &info.api_level.to_string());
  }
  Ok(ExitCode::SUCCESS)
}
