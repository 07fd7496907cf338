//! Test utilities for voxbuild-lib.
//!
//! Builds throwaway NDK layouts and shell snippets that stand in for the real
//! external builds, so pipelines can be exercised without a toolchain.

use std::path::{Path, PathBuf};

use crate::consts::NDK_DESCRIPTOR;
use crate::platform::TargetId;

pub const HOST_TAG: &str = "linux-x86_64";
pub const NDK_REVISION: &str = "25.2.9519653";

/// Write an executable stub script.
pub fn write_executable(path: &Path) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }
}

/// Directory holding the LLVM binaries of a fake NDK.
pub fn ndk_bin_dir(ndk_root: &Path) -> PathBuf {
  ndk_root
    .join("toolchains")
    .join("llvm")
    .join("prebuilt")
    .join(HOST_TAG)
    .join("bin")
}

/// Lay out a minimal NDK with compilers for `targets` at API level `api`.
pub fn fake_ndk(ndk_root: &Path, targets: &[TargetId], api: u32) {
  std::fs::create_dir_all(ndk_root).unwrap();
  std::fs::write(
    ndk_root.join(NDK_DESCRIPTOR),
    format!("Pkg.Desc = Android NDK\nPkg.Revision = {}\n", NDK_REVISION),
  )
  .unwrap();

  let bin = ndk_bin_dir(ndk_root);
  for tool in ["llvm-ar", "llvm-ranlib", "ld.lld"] {
    write_executable(&bin.join(tool));
  }
  for target in targets {
    write_executable(&bin.join(format!("{}{}-clang", target.clang_prefix(), api)));
    write_executable(&bin.join(format!("{}{}-clang++", target.clang_prefix(), api)));
  }

  let sysroot = ndk_root
    .join("toolchains")
    .join("llvm")
    .join("prebuilt")
    .join(HOST_TAG)
    .join("sysroot");
  std::fs::create_dir_all(sysroot.join("usr").join("include")).unwrap();
}

/// Minimal ELF header describing a shared object for `target`.
///
/// Only the identification block and the fixed header fields are filled in;
/// there are no program or section headers.
pub fn elf_header(target: TargetId) -> Vec<u8> {
  elf_header_for(target.is_64bit(), target.elf_machine())
}

pub fn elf_header_for(is_64: bool, machine: u16) -> Vec<u8> {
  let mut bytes = vec![0x7f, b'E', b'L', b'F', if is_64 { 2 } else { 1 }, 1, 1, 0];
  bytes.resize(16, 0);
  bytes.extend_from_slice(&3u16.to_le_bytes()); // ET_DYN
  bytes.extend_from_slice(&machine.to_le_bytes());
  bytes.extend_from_slice(&1u32.to_le_bytes());
  let word = if is_64 { 8 } else { 4 };
  // e_entry, e_phoff, e_shoff
  bytes.extend(std::iter::repeat_n(0u8, word * 3));
  bytes.extend_from_slice(&0u32.to_le_bytes()); // e_flags
  let (ehsize, phentsize, shentsize): (u16, u16, u16) = if is_64 { (64, 56, 64) } else { (52, 32, 40) };
  bytes.extend_from_slice(&ehsize.to_le_bytes());
  bytes.extend_from_slice(&phentsize.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
  bytes.extend_from_slice(&shentsize.to_le_bytes());
  bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
  bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
  bytes.resize(64, 0);
  bytes
}

/// Shell snippet that writes `bytes` to `path` using POSIX printf octal escapes.
pub fn printf_bytes_cmd(bytes: &[u8], path: &Path) -> String {
  let escaped: String = bytes.iter().map(|b| format!("\\{:03o}", b)).collect();
  format!("mkdir -p '{}' && printf '{}' > '{}'", path.parent().unwrap().display(), escaped, path.display())
}

/// Shell snippet that creates an empty marker file (and its parents).
pub fn touch_cmd(path: &Path) -> String {
  format!("mkdir -p '{}' && : > '{}'", path.parent().unwrap().display(), path.display())
}
