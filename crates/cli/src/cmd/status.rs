//! Implementation of the `voxb status` command.
//!
//! Re-verifies every slot of the canonical output tree.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use voxbuild_lib::artifact;
use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::platform::TargetId;

use crate::output::{OutputFormat, Tone, emit, print_json, slot_line};

#[derive(Serialize)]
#[serde(rename_all = "lowercase", tag = "state")]
enum Slot {
  Present { size: u64, sha256: String },
  Absent,
  Invalid { error: String },
}

#[derive(Serialize)]
struct SlotReport {
  target: TargetId,
  #[serde(flatten)]
  slot: Slot,
}

pub fn cmd_status(config: &BuildConfig, format: OutputFormat) -> Result<ExitCode> {
  let slots: Vec<SlotReport> = artifact::scan(&config.output_root)
    .into_iter()
    .map(|(target, result)| SlotReport {
      target,
      slot: match result {
        Ok(Some(a)) => Slot::Present {
          size: a.size,
          sha256: a.sha256.0,
        },
        Ok(None) => Slot::Absent,
        Err(e) => Slot::Invalid { error: e.to_string() },
      },
    })
    .collect();

  if format.is_json() {
    print_json(&slots)?;
    return Ok(ExitCode::SUCCESS);
  }

  emit(Tone::Note, &format!("Output tree: {}", config.output_root.display()));
  for report in &slots {
    let abi = report.target.as_str();
    match &report.slot {
      Slot::Present { size, sha256 } => emit(Tone::Done, &slot_line(report.target, *size, sha256)),
      Slot::Absent => emit(Tone::Skipped, &format!("{:<12} absent", abi)),
      Slot::Invalid { error } => emit(Tone::Failed, &format!("{:<12} {}", abi, error)),
    }
  }

  Ok(ExitCode::SUCCESS)
}
