use std::fmt;

/// Machine the NDK toolchain runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
  Linux,
  MacOs,
  Windows,
}

impl HostOs {
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }
}

impl fmt::Display for HostOs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Name of the `toolchains/llvm/prebuilt/<tag>` directory for a host.
///
/// The NDK only ships x86_64 host binaries; Apple Silicon runs them through
/// Rosetta, so macOS maps to `darwin-x86_64` regardless of CPU. Linux hosts on
/// other CPUs have no prebuilt toolchain.
pub fn ndk_host_tag(os: HostOs, arch: &str) -> Option<String> {
  match (os, arch) {
    (HostOs::Linux, "x86_64") => Some("linux-x86_64".to_string()),
    (HostOs::MacOs, "x86_64" | "aarch64") => Some("darwin-x86_64".to_string()),
    (HostOs::Windows, "x86_64") => Some("windows-x86_64".to_string()),
    _ => None,
  }
}

/// Returns the NDK host tag of the running machine, if the NDK supports it.
pub fn current_host_tag() -> Option<String> {
  ndk_host_tag(HostOs::current()?, std::env::consts::ARCH)
}
