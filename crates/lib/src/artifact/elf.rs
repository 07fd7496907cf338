//! ELF checks for produced libraries.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use goblin::elf::Elf;
use goblin::elf::header::{EI_CLASS, ELFCLASS32, ELFCLASS64, ET_DYN};

use super::ArtifactError;
use crate::platform::TargetId;

/// Largest ELF header (64-bit).
const HEADER_LEN: usize = 64;

/// Check that `path` is a shared object built for `target`.
pub fn verify_header(target: TargetId, path: &Path) -> Result<(), ArtifactError> {
  let mut bytes = Vec::with_capacity(HEADER_LEN);
  File::open(path)?.take(HEADER_LEN as u64).read_to_end(&mut bytes)?;

  let header = Elf::parse_header(&bytes).map_err(|e| ArtifactError::NotElf {
    path: path.to_path_buf(),
    reason: e.to_string(),
  })?;

  let expected_class = if target.is_64bit() { ELFCLASS64 } else { ELFCLASS32 };
  let found_class = header.e_ident[EI_CLASS];
  if found_class != expected_class {
    return Err(ArtifactError::WrongClass {
      path: path.to_path_buf(),
      target,
      expected: class_bits(expected_class),
      found: class_bits(found_class),
    });
  }

  if header.e_machine != target.elf_machine() {
    return Err(ArtifactError::WrongMachine {
      path: path.to_path_buf(),
      target,
      expected: target.elf_machine(),
      found: header.e_machine,
    });
  }

  if header.e_type != ET_DYN {
    return Err(ArtifactError::NotSharedObject {
      path: path.to_path_buf(),
      e_type: header.e_type,
    });
  }

  Ok(())
}

/// Check that every name in `required` is a defined dynamic symbol.
pub fn verify_exports(path: &Path, required: &[&str]) -> Result<(), ArtifactError> {
  let bytes = std::fs::read(path)?;
  let elf = Elf::parse(&bytes).map_err(|e| ArtifactError::NotElf {
    path: path.to_path_buf(),
    reason: e.to_string(),
  })?;

  let exported: Vec<&str> = elf
    .dynsyms
    .iter()
    .filter(|sym| !sym.is_import())
    .filter_map(|sym| elf.dynstrtab.get_at(sym.st_name))
    .collect();

  let missing: Vec<String> = required
    .iter()
    .filter(|name| !exported.contains(*name))
    .map(|name| name.to_string())
    .collect();

  if missing.is_empty() {
    Ok(())
  } else {
    Err(ArtifactError::MissingExports {
      path: path.to_path_buf(),
      symbols: missing,
    })
  }
}

fn class_bits(class: u8) -> u8 {
  match class {
    ELFCLASS32 => 32,
    ELFCLASS64 => 64,
    other => other,
  }
}
