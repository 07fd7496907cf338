//! Build command integration tests.
//!
//! The real stage recipes run here; `git` is a stub that always fails, so a
//! build either fails at its first stage or finds every marker in place.

use predicates::prelude::*;

use super::common::{TestEnv, elf_header, zip_entries, zip_manifest};

/// Pre-populate every stage marker of the x86 workspace.
fn complete_x86_workspace(env: &TestEnv) {
  for marker in [
    "local/lib/libopenblas.a",
    "local/lib/liblapack.a",
    "local/lib/libfst.a",
    "kaldi/src/online2/kaldi-online2.a",
  ] {
    env.write_file(&format!("ws/x86/{}", marker), "");
  }
  let lib = env.path("ws/x86/vosk/libvosk.so");
  std::fs::create_dir_all(lib.parent().unwrap()).unwrap();
  std::fs::write(lib, elf_header(false, 3)).unwrap();
}

#[test]
fn environment_failure_starts_no_pipeline() {
  let env = TestEnv::new();

  env
    .voxb_cmd()
    .arg("--ndk-root")
    .arg(env.path("no-such-ndk"))
    .arg("build")
    .assert()
    .code(3);

  assert!(!env.path("ws").exists());
  assert!(!env.output_root().exists());
}

#[test]
fn failing_stage_is_reported_with_tool_output() {
  let env = TestEnv::new();

  env
    .voxb_cmd()
    .args(["-t", "x86", "build"])
    .assert()
    .code(4)
    .stderr(predicate::str::contains("failed:mathlib:command failed with exit code Some(128)"))
    // The tool's diagnostic is printed indented under the failed target.
    .stderr(predicate::str::contains("\n    fatal: unable to access remote"))
    .stderr(predicate::str::contains("No target was built"))
    .stdout(predicate::str::contains("Cloning into").not());
}

#[test]
fn json_report_names_failed_stage() {
  let env = TestEnv::new();

  let output = env
    .voxb_cmd()
    .args(["-o", "json", "-t", "arm64-v8a", "build"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(4));

  // Tool output never reaches stdout, so the report stays parseable.
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["verdict"], "failure");
  let target = &json["report"]["targets"]["arm64-v8a"];
  assert_eq!(target["status"], "failed");
  assert_eq!(target["stage"], "mathlib");
  let reason = target["reason"].as_str().unwrap();
  assert!(reason.contains("exit code Some(128)"));
  assert!(reason.contains("fatal: unable to access remote"));
  assert_eq!(target["stages"][0]["status"], "failed");
}

#[test]
fn completed_workspace_is_resumed_without_rebuilding() {
  let env = TestEnv::new();
  complete_x86_workspace(&env);

  let output = env
    .voxb_cmd()
    .args(["-o", "json", "-t", "x86", "build"])
    .output()
    .unwrap();
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["verdict"], "success");
  let stages = json["report"]["targets"]["x86"]["stages"].as_array().unwrap();
  assert_eq!(stages.len(), 5);
  assert!(stages.iter().all(|s| s["status"] == "skipped-cached"));
  assert!(env.output_root().join("x86/libvosk.so").exists());
}

#[test]
fn partial_build_packages_what_succeeded() {
  let env = TestEnv::new();
  complete_x86_workspace(&env);

  env
    .voxb_cmd()
    .args(["-t", "x86", "-t", "x86_64", "build", "--package"])
    .assert()
    .success()
    .stderr(predicate::str::contains("failed:mathlib:"))
    .stdout(predicate::str::contains("Packaged vosk-android 0.3.45"))
    .stderr(predicate::str::contains("missing from the package: x86_64"));

  assert_eq!(
    zip_entries(&env.package_path()),
    vec!["jni/x86/libvosk.so", "manifest.json"]
  );
  let manifest = zip_manifest(&env.package_path());
  assert_eq!(manifest["included"], serde_json::json!(["x86"]));
  assert_eq!(manifest["missing"], serde_json::json!(["x86_64"]));
}

#[test]
fn excluded_targets_are_listed_as_skipped() {
  let env = TestEnv::new();
  complete_x86_workspace(&env);

  env
    .voxb_cmd()
    .args(["-t", "x86", "-t", "arm64-v8a", "--exclude", "arm64-v8a", "build"])
    .assert()
    .success()
    .stdout(predicate::str::contains("skipped (excluded)"))
    .stdout(predicate::str::contains("All targets built"));
}

#[test]
fn install_copies_library_and_header() {
  let env = TestEnv::new();
  complete_x86_workspace(&env);

  env.voxb_cmd().args(["-t", "x86", "--install", "build"]).assert().success();

  assert!(env.path("install/x86/lib/libvosk.so").exists());
  assert!(env.path("install/include/vosk_api.h").exists());
}

#[test]
fn invalid_timeout_is_a_usage_error() {
  let env = TestEnv::new();

  env.voxb_cmd().args(["build", "--timeout", "soon"]).assert().code(1);
}
