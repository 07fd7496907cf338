//! Validate command integration tests.

use predicates::prelude::*;

use super::common::{HOST_TAG, TestEnv};

#[test]
fn validate_reports_ndk_revision() {
  let env = TestEnv::new();

  env
    .voxb_cmd()
    .arg("validate")
    .assert()
    .success()
    .stdout(predicate::str::contains("Environment OK (NDK 25.2.9519653)"))
    .stdout(predicate::str::contains("armeabi-v7a, arm64-v8a, x86, x86_64"));
}

#[test]
fn missing_ndk_root_is_an_environment_failure() {
  let env = TestEnv::new();

  env
    .voxb_cmd()
    .arg("--ndk-root")
    .arg(env.path("no-such-ndk"))
    .arg("validate")
    .assert()
    .code(3)
    .stderr(predicate::str::contains("NDK root does not exist"));
}

#[test]
fn missing_tool_is_an_environment_failure() {
  let env = TestEnv::new();
  std::fs::remove_file(env.path("bin/git")).unwrap();

  env
    .voxb_cmd()
    .arg("validate")
    .assert()
    .code(3)
    .stderr(predicate::str::contains("required tool 'git'"));
}

#[test]
fn old_ndk_is_rejected() {
  let env = TestEnv::new();
  env.write_file("ndk/source.properties", "Pkg.Revision = 21.4.7075529\n");

  env
    .voxb_cmd()
    .arg("validate")
    .assert()
    .code(3)
    .stderr(predicate::str::contains("too old"));
}

#[test]
fn missing_compiler_fails_unless_forced() {
  let env = TestEnv::new();
  std::fs::remove_file(env.path(&format!(
    "ndk/toolchains/llvm/prebuilt/{}/bin/i686-linux-android21-clang",
    HOST_TAG
  )))
  .unwrap();

  env
    .voxb_cmd()
    .arg("validate")
    .assert()
    .code(3)
    .stderr(predicate::str::contains("compiler for x86 not found"));

  env
    .voxb_cmd()
    .arg("--force")
    .arg("validate")
    .assert()
    .success()
    .stderr(predicate::str::contains("x86 dropped"));
}

#[test]
fn validate_json_lists_buildable_targets() {
  let env = TestEnv::new();

  let output = env
    .voxb_cmd()
    .args(["-o", "json", "-t", "x86_64", "-t", "arm64-v8a", "validate"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["ndk_revision"], "25.2.9519653");
  assert_eq!(json["buildable"], serde_json::json!(["arm64-v8a", "x86_64"]));
}
