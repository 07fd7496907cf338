//! Implementation of the `voxb build` command.
//!
//! Runs every requested target's pipeline, prints the per-target report and,
//! with `--package`, bundles whatever was built.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use voxbuild_lib::config::BuildConfig;
use voxbuild_lib::orchestrate::{BuildOrchestrator, BuildReport, Verdict};
use voxbuild_lib::package::{PackageManifest, Packager};

use super::exit;
use super::package::print_package;
use crate::output::{OutputFormat, Tone, emit, format_elapsed, print_json, print_stat, print_target};

#[derive(Serialize)]
struct BuildOutput<'a> {
  verdict: Verdict,
  elapsed_secs: u64,
  report: &'a BuildReport,
  package: Option<&'a PackageManifest>,
  package_error: Option<String>,
}

pub fn cmd_build(config: BuildConfig, package: bool, timeout: Option<Duration>, format: OutputFormat) -> Result<ExitCode> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let orchestrator = BuildOrchestrator::native(config);
  let token = CancellationToken::new();

  let report = rt
    .block_on(async {
      watch_for_cancel(&token, timeout);
      orchestrator.run_all(&token).await
    })
    .context("Build failed")?;
  let elapsed = started.elapsed();
  let verdict = report.verdict();

  let packaged = if package && verdict != Verdict::Failure {
    let config = orchestrator.config();
    Some(Packager::from_config(config).package(&config.output_root, &report.requested()))
  } else {
    None
  };

  if format.is_json() {
    let (manifest, package_error) = match &packaged {
      Some(Ok(p)) => (Some(&p.manifest), None),
      Some(Err(e)) => (None, Some(e.to_string())),
      None => (None, None),
    };
    print_json(&BuildOutput {
      verdict,
      elapsed_secs: elapsed.as_secs(),
      report: &report,
      package: manifest,
      package_error,
    })?;
  } else {
    print_report(&report, elapsed);
    if let Some(Ok(p)) = &packaged {
      println!();
      print_package(p);
    }
  }

  if verdict == Verdict::Failure {
    return Ok(ExitCode::from(exit::BUILD));
  }
  if let Some(Err(e)) = packaged {
    emit(Tone::Failed, &format!("Packaging failed: {}", e));
    return Ok(ExitCode::from(exit::PACKAGING));
  }
  Ok(ExitCode::SUCCESS)
}

/// Cancel `token` on Ctrl-C or once `timeout` elapses.
fn watch_for_cancel(token: &CancellationToken, timeout: Option<Duration>) {
  let on_signal = token.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling running builds");
      on_signal.cancel();
    }
  });

  if let Some(limit) = timeout {
    let on_timeout = token.clone();
    tokio::spawn(async move {
      tokio::time::sleep(limit).await;
      warn!(timeout = %humantime::format_duration(limit), "timed out, cancelling running builds");
      on_timeout.cancel();
    });
  }
}

fn print_report(report: &BuildReport, elapsed: Duration) {
  for target in report.targets.values() {
    print_target(target);
  }

  println!();
  print_stat("NDK", &report.ndk_revision);
  print_stat("Elapsed", &format_elapsed(elapsed));

  let absent: Vec<&str> = report.absent().iter().map(|t| t.as_str()).collect();
  match report.verdict() {
    Verdict::Success => emit(Tone::Done, "All targets built"),
    Verdict::Partial => emit(Tone::Warn, &format!("Partial success; missing from the package: {}", absent.join(", "))),
    Verdict::Failure => emit(Tone::Failed, "No target was built"),
  }
}
