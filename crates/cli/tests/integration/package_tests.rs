//! Package and status command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, zip_entries, zip_manifest};

#[test]
fn empty_output_tree_is_a_packaging_failure() {
  let env = TestEnv::new();

  env
    .voxb_cmd()
    .arg("package")
    .assert()
    .code(5)
    .stderr(predicate::str::contains("no valid artifacts"));

  assert!(!env.package_path().exists());
}

#[test]
fn partial_package_records_missing_targets() {
  let env = TestEnv::new();
  env.stage_artifact("arm64-v8a");

  env
    .voxb_cmd()
    .args(["-t", "arm64-v8a", "-t", "armeabi-v7a", "package"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Packaged vosk-android 0.3.45 (1 target(s))"))
    .stderr(predicate::str::contains("Package is missing: armeabi-v7a"));

  assert_eq!(
    zip_entries(&env.package_path()),
    vec!["jni/arm64-v8a/libvosk.so", "manifest.json"]
  );
  let manifest = zip_manifest(&env.package_path());
  assert_eq!(manifest["included"], serde_json::json!(["arm64-v8a"]));
  assert_eq!(manifest["missing"], serde_json::json!(["armeabi-v7a"]));
  assert_eq!(manifest["artifacts"][0]["size"], 64);
}

#[test]
fn package_includes_every_valid_artifact() {
  let env = TestEnv::new();
  for abi in ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"] {
    env.stage_artifact(abi);
  }

  let output = env.voxb_cmd().args(["-o", "json", "package"]).output().unwrap();
  assert!(output.status.success());

  let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(manifest["missing"], serde_json::json!([]));
  assert_eq!(manifest["included"].as_array().unwrap().len(), 4);
  assert_eq!(manifest["build_type"], "Release");
}

#[test]
fn status_distinguishes_present_absent_and_invalid() {
  let env = TestEnv::new();
  env.stage_artifact("x86");
  env.write_file("jniLibs/arm64-v8a/libvosk.so", "not an elf file, just text padding it out a bit.......");

  let output = env.voxb_cmd().args(["-o", "json", "status"]).output().unwrap();
  assert!(output.status.success());

  let slots: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let state_of = |abi: &str| {
    slots
      .as_array()
      .unwrap()
      .iter()
      .find(|s| s["target"] == abi)
      .map(|s| s["state"].as_str().unwrap().to_string())
      .unwrap()
  };
  assert_eq!(state_of("x86"), "present");
  assert_eq!(state_of("arm64-v8a"), "invalid");
  assert_eq!(state_of("x86_64"), "absent");
}
