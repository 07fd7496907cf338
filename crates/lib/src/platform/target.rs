use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Android ABIs the pipeline knows how to cross-compile for.
///
/// The ordering is the canonical report/package order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetId {
  ArmeabiV7a,
  Arm64V8a,
  X86,
  X86_64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target '{0}' (known: armeabi-v7a, arm64-v8a, x86, x86_64)")]
pub struct UnknownTarget(pub String);

impl TargetId {
  pub const ALL: [TargetId; 4] = [Self::ArmeabiV7a, Self::Arm64V8a, Self::X86, Self::X86_64];

  /// ABI name as used by the Android packaging tools.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ArmeabiV7a => "armeabi-v7a",
      Self::Arm64V8a => "arm64-v8a",
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
    }
  }

  /// Prefix of the API-suffixed clang driver in the NDK (`<prefix><api>-clang`).
  pub fn clang_prefix(&self) -> &'static str {
    match self {
      Self::ArmeabiV7a => "armv7a-linux-androideabi",
      Self::Arm64V8a => "aarch64-linux-android",
      Self::X86 => "i686-linux-android",
      Self::X86_64 => "x86_64-linux-android",
    }
  }

  /// GNU host triple passed to autotools `--host`.
  pub fn host_triple(&self) -> &'static str {
    match self {
      Self::ArmeabiV7a => "arm-linux-androideabi",
      Self::Arm64V8a => "aarch64-linux-android",
      Self::X86 => "i686-linux-android",
      Self::X86_64 => "x86_64-linux-android",
    }
  }

  pub fn is_64bit(&self) -> bool {
    matches!(self, Self::Arm64V8a | Self::X86_64)
  }

  pub fn is_x86_family(&self) -> bool {
    matches!(self, Self::X86 | Self::X86_64)
  }

  /// ELF `e_machine` value binaries for this target must carry.
  pub fn elf_machine(&self) -> u16 {
    use goblin::elf::header::{EM_386, EM_AARCH64, EM_ARM, EM_X86_64};
    match self {
      Self::ArmeabiV7a => EM_ARM,
      Self::Arm64V8a => EM_AARCH64,
      Self::X86 => EM_386,
      Self::X86_64 => EM_X86_64,
    }
  }

  /// OpenBLAS `TARGET=` core name.
  pub fn openblas_target(&self) -> &'static str {
    match self {
      Self::ArmeabiV7a => "ARMV7",
      Self::Arm64V8a => "ARMV8",
      Self::X86 | Self::X86_64 => "ATOM",
    }
  }

  /// Target-specific compiler flags appended to every C/C++ compile.
  pub fn cflags(&self) -> &'static [&'static str] {
    match self {
      Self::ArmeabiV7a => &["-mfloat-abi=softfp", "-mfpu=neon"],
      Self::Arm64V8a => &[],
      Self::X86 => &["-mssse3"],
      Self::X86_64 => &["-msse4.2", "-mpopcnt"],
    }
  }
}

impl fmt::Display for TargetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for TargetId {
  type Err = UnknownTarget;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| UnknownTarget(s.to_string()))
  }
}

impl TryFrom<String> for TargetId {
  type Error = UnknownTarget;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<TargetId> for String {
  fn from(value: TargetId) -> Self {
    value.as_str().to_string()
  }
}
