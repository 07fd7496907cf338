//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const HOST_TAG: &str = "linux-x86_64";

/// ABI name, clang prefix, 64-bit, ELF machine.
pub const TARGETS: [(&str, &str, bool, u16); 4] = [
  ("armeabi-v7a", "armv7a-linux-androideabi", false, 40),
  ("arm64-v8a", "aarch64-linux-android", true, 183),
  ("x86", "i686-linux-android", false, 3),
  ("x86_64", "x86_64-linux-android", true, 62),
];

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding a fake NDK, the library
/// sources, a private `bin/` used as PATH, and all output locations.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// Fake NDK with compilers for every known target, sources, and a config
  /// file pointing at them.
  pub fn new() -> Self {
    let env = Self::empty();
    env.write_ndk(&TARGETS.map(|t| t.0));
    env.write_file("vosk-src/vosk_api.h", "/* api */");
    // Every external build step fails fast instead of touching the network.
    env.write_executable(
      "bin/git",
      "#!/bin/sh\necho 'Cloning into OpenBLAS...'\necho 'fatal: unable to access remote' >&2\nexit 128\n",
    );
    env.write_config("");
    env
  }

  /// Create an empty test environment.
  ///
  /// Use this when you need to manually set up the directory structure.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("voxbuild.toml");
    Self { temp, config_path }
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    let root = dunce::canonicalize(self.temp.path()).unwrap_or_else(|_| self.temp.path().to_path_buf());
    root.join(relative)
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn write_executable(&self, relative_path: &str, content: &str) {
    self.write_file(relative_path, content);
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      std::fs::set_permissions(self.path(relative_path), std::fs::Permissions::from_mode(0o755)).unwrap();
    }
  }

  /// NDK layout with API 21 compilers for the given ABIs.
  pub fn write_ndk(&self, abis: &[&str]) {
    self.write_file("ndk/source.properties", "Pkg.Desc = Android NDK\nPkg.Revision = 25.2.9519653\n");
    let bin = format!("ndk/toolchains/llvm/prebuilt/{}/bin", HOST_TAG);
    for tool in ["llvm-ar", "llvm-ranlib", "ld.lld"] {
      self.write_executable(&format!("{}/{}", bin, tool), "#!/bin/sh\nexit 0\n");
    }
    for (abi, prefix, _, _) in TARGETS {
      if abis.contains(&abi) {
        self.write_executable(&format!("{}/{}21-clang", bin, prefix), "#!/bin/sh\nexit 0\n");
        self.write_executable(&format!("{}/{}21-clang++", bin, prefix), "#!/bin/sh\nexit 0\n");
      }
    }
    std::fs::create_dir_all(self.path(&format!("ndk/toolchains/llvm/prebuilt/{}/sysroot/usr/include", HOST_TAG)))
      .unwrap();
  }

  /// Config pointing every location into the temp dir, plus `extra` TOML.
  pub fn write_config(&self, extra: &str) {
    let content = format!(
      r#"ndk_root = "{ndk}"
workspace_root = "{ws}"
output_root = "{out}"
package_dir = "{dist}"
source_dir = "{src}"
install_prefix = "{install}"
host_tag = "{HOST_TAG}"
required_tools = ["git"]
package_name = "vosk-android"
package_version = "0.3.45"
{extra}
"#,
      ndk = self.path("ndk").display(),
      ws = self.path("ws").display(),
      out = self.output_root().display(),
      dist = self.path("dist").display(),
      src = self.path("vosk-src").display(),
      install = self.path("install").display(),
    );
    std::fs::write(&self.config_path, content).unwrap();
  }

  pub fn output_root(&self) -> PathBuf {
    self.path("jniLibs")
  }

  pub fn package_path(&self) -> PathBuf {
    self.path("dist/vosk-android-0.3.45.zip")
  }

  /// Place a valid library for `abi` in the output tree.
  pub fn stage_artifact(&self, abi: &str) {
    let (_, _, is_64, machine) = TARGETS.iter().copied().find(|t| t.0 == abi).unwrap();
    let path = self.output_root().join(abi).join("libvosk.so");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, elf_header(is_64, machine)).unwrap();
  }

  /// Get a Command for the voxb binary, isolated from the caller's environment.
  pub fn voxb_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("voxb");
    cmd
      .current_dir(self.temp.path())
      .env("PATH", self.path("bin"))
      .env("NO_COLOR", "1")
      .env_remove("ANDROID_NDK_HOME")
      .env_remove("VOXBUILD_NDK_ROOT")
      .env_remove("VOXBUILD_WORKSPACE")
      .env_remove("VOXBUILD_OUTPUT")
      .env_remove("RUST_LOG")
      .arg("--config")
      .arg(&self.config_path);
    cmd
  }
}

/// Minimal ELF header of a shared object.
pub fn elf_header(is_64: bool, machine: u16) -> Vec<u8> {
  let mut bytes = vec![0x7f, b'E', b'L', b'F', if is_64 { 2 } else { 1 }, 1, 1, 0];
  bytes.resize(16, 0);
  bytes.extend_from_slice(&3u16.to_le_bytes());
  bytes.extend_from_slice(&machine.to_le_bytes());
  bytes.extend_from_slice(&1u32.to_le_bytes());
  let word = if is_64 { 8 } else { 4 };
  bytes.extend(std::iter::repeat_n(0u8, word * 3));
  bytes.extend_from_slice(&0u32.to_le_bytes());
  let (ehsize, phentsize, shentsize): (u16, u16, u16) = if is_64 { (64, 56, 64) } else { (52, 32, 40) };
  bytes.extend_from_slice(&ehsize.to_le_bytes());
  bytes.extend_from_slice(&phentsize.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes());
  bytes.extend_from_slice(&shentsize.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes());
  bytes.resize(64, 0);
  bytes
}

/// Names of the entries in a zip archive, sorted.
pub fn zip_entries(path: &Path) -> Vec<String> {
  let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
  let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
  names.sort();
  names
}

/// The `manifest.json` stored in a package.
pub fn zip_manifest(path: &Path) -> serde_json::Value {
  let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
  serde_json::from_reader(archive.by_name("manifest.json").unwrap()).unwrap()
}
