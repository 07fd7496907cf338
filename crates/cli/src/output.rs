//! What `voxb` prints for humans.
//!
//! Every line starts with a mark for its [`Tone`]. Failures and warnings go to
//! stderr so that `--format json` keeps stdout parseable; tracing logs go to
//! stderr as well.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use voxbuild_lib::orchestrate::{TargetReport, TargetStatus};
use voxbuild_lib::platform::TargetId;

/// Column width of the ABI name in per-target lines.
const ABI_WIDTH: usize = 12;
/// Hex digits of a SHA-256 shown in the status listing.
const SHORT_HASH: usize = 12;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Done,
  Failed,
  Warn,
  Note,
  Skipped,
}

impl Tone {
  fn mark(self) -> &'static str {
    match self {
      Tone::Done => "✓",
      Tone::Failed => "✗",
      Tone::Warn => "⚠",
      Tone::Note => "•",
      Tone::Skipped => "-",
    }
  }

  fn stream(self) -> Stream {
    match self {
      Tone::Failed | Tone::Warn => Stream::Stderr,
      _ => Stream::Stdout,
    }
  }
}

pub fn emit(tone: Tone, message: &str) {
  let stream = tone.stream();
  let mark = tone.mark();
  let mark = match tone {
    Tone::Done => mark.if_supports_color(stream, |s| s.green()).to_string(),
    Tone::Failed => mark.if_supports_color(stream, |s| s.red()).to_string(),
    Tone::Warn => mark.if_supports_color(stream, |s| s.yellow()).to_string(),
    Tone::Note => mark.if_supports_color(stream, |s| s.blue()).to_string(),
    Tone::Skipped => mark.if_supports_color(stream, |s| s.dimmed()).to_string(),
  };
  match stream {
    Stream::Stderr => eprintln!("{} {}", mark, message),
    _ => println!("{} {}", mark, message),
  }
}

pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// `<abi>  <status>` plus the tone it is printed with.
pub fn target_line(report: &TargetReport) -> (Tone, String) {
  let abi = report.target.as_str();
  match &report.status {
    TargetStatus::Succeeded => (Tone::Done, format!("{:<ABI_WIDTH$} {}", abi, report.status)),
    TargetStatus::Failed { .. } => (Tone::Failed, format!("{:<ABI_WIDTH$} {}", abi, report.status)),
    TargetStatus::Skipped { reason } => (Tone::Skipped, format!("{:<ABI_WIDTH$} {} ({})", abi, report.status, reason)),
  }
}

/// The target line, then any further lines of a failure reason indented
/// beneath it. Those usually carry the failing tool's stderr.
pub fn print_target(report: &TargetReport) {
  let (tone, line) = target_line(report);
  emit(tone, &line);
  if let TargetStatus::Failed { reason, .. } = &report.status {
    for detail in reason.lines().skip(1) {
      eprintln!("    {}", detail);
    }
  }
}

/// `<abi>  <size> <short sha256>` for a verified slot.
pub fn slot_line(target: TargetId, size: u64, sha256: &str) -> String {
  let short = sha256.get(..SHORT_HASH).unwrap_or(sha256);
  format!("{:<ABI_WIDTH$} {} {}", target.as_str(), format_size(size), short)
}

/// Binary units; shared libraries land anywhere from KiB to tens of MiB.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  if unit == 0 {
    format!("{} B", bytes)
  } else {
    format!("{:.1} {}", value, UNITS[unit])
  }
}

/// Whole seconds; builds take minutes, so sub-second noise is dropped.
pub fn format_elapsed(elapsed: Duration) -> String {
  humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}
