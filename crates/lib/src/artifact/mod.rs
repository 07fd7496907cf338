//! Verification and staging of produced libraries.
//!
//! The canonical output tree is `<output_root>/<target>/libvosk.so`. Only
//! [`collect`] writes into it, and only after the file passed verification.

mod elf;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{ARTIFACT_FILE, PUBLIC_HEADER, REQUIRED_EXPORTS};
use crate::platform::TargetId;
use crate::util::hash::{ContentHash, hash_file};

pub use elf::{verify_exports, verify_header};

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("artifact not found at {0}")]
  Missing(PathBuf),

  #[error("artifact at {0} is empty")]
  Empty(PathBuf),

  #[error("{path} is not an ELF file: {reason}")]
  NotElf { path: PathBuf, reason: String },

  #[error("{path} is {found}-bit, {target} needs {expected}-bit")]
  WrongClass {
    path: PathBuf,
    target: TargetId,
    expected: u8,
    found: u8,
  },

  #[error("{path} was built for machine {found}, {target} needs {expected}")]
  WrongMachine {
    path: PathBuf,
    target: TargetId,
    expected: u16,
    found: u16,
  },

  #[error("{path} is not a shared object (e_type {e_type})")]
  NotSharedObject { path: PathBuf, e_type: u16 },

  #[error("{path} does not export: {}", .symbols.join(", "))]
  MissingExports { path: PathBuf, symbols: Vec<String> },

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// A verified library in the canonical output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub target: TargetId,
  pub path: PathBuf,
  pub size: u64,
  pub sha256: ContentHash,
  /// Whether the binary passed format verification for its target.
  pub valid: bool,
}

/// Where `target`'s artifact lives in the output tree.
pub fn canonical_path(output_root: &Path, target: TargetId) -> PathBuf {
  output_root.join(target.as_str()).join(ARTIFACT_FILE)
}

/// Verify `produced` and copy it into the output tree, replacing any stale
/// artifact for the same target.
///
/// With `run_tests` the library's dynamic symbol table must also export the
/// public API. On any error the target's slot is left empty, so a rejected
/// build never leaves an older library behind.
pub fn collect(target: TargetId, produced: &Path, output_root: &Path, run_tests: bool) -> Result<Artifact, ArtifactError> {
  match stage(target, produced, output_root, run_tests) {
    Ok(artifact) => Ok(artifact),
    Err(e) => {
      if let Err(discard_err) = discard(output_root, target) {
        warn!(target = %target, error = %discard_err, "failed to remove stale artifact");
      }
      Err(e)
    }
  }
}

/// Remove `target`'s artifact from the output tree.
///
/// Returns whether there was one.
pub fn discard(output_root: &Path, target: TargetId) -> io::Result<bool> {
  let path = canonical_path(output_root, target);
  match std::fs::remove_file(&path) {
    Ok(()) => {
      info!(target = %target, path = %path.display(), "artifact removed from output tree");
      Ok(true)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}

fn stage(target: TargetId, produced: &Path, output_root: &Path, run_tests: bool) -> Result<Artifact, ArtifactError> {
  let size = check_file(target, produced)?;
  if run_tests {
    verify_exports(produced, REQUIRED_EXPORTS)?;
    debug!(target = %target, "exports present");
  }

  let dest = canonical_path(output_root, target);
  let dir = dest.parent().unwrap_or(output_root);
  std::fs::create_dir_all(dir)?;

  // Copy next to the destination, then rename over it.
  let mut staged = NamedTempFile::new_in(dir)?;
  io::copy(&mut std::fs::File::open(produced)?, &mut staged)?;
  staged.persist(&dest).map_err(|e| ArtifactError::Io(e.error))?;

  let sha256 = hash_file(&dest)?;
  info!(target = %target, path = %dest.display(), size, "artifact collected");

  Ok(Artifact {
    target,
    path: dest,
    size,
    sha256,
    valid: true,
  })
}

/// Re-verify the artifact already in the output tree for `target`.
///
/// Returns `Ok(None)` when there is none.
pub fn inspect(target: TargetId, output_root: &Path) -> Result<Option<Artifact>, ArtifactError> {
  let path = canonical_path(output_root, target);
  if !path.exists() {
    return Ok(None);
  }

  let size = check_file(target, &path)?;
  let sha256 = hash_file(&path)?;
  Ok(Some(Artifact {
    target,
    path,
    size,
    sha256,
    valid: true,
  }))
}

/// Inspect every known target's slot in the output tree.
pub fn scan(output_root: &Path) -> Vec<(TargetId, Result<Option<Artifact>, ArtifactError>)> {
  TargetId::ALL
    .iter()
    .map(|target| (*target, inspect(*target, output_root)))
    .collect()
}

/// Copy a collected artifact and the public header into an install prefix.
///
/// Produces `<prefix>/<target>/lib/libvosk.so` and `<prefix>/include/vosk_api.h`.
pub fn install(artifact: &Artifact, source_dir: &Path, prefix: &Path) -> io::Result<PathBuf> {
  let lib_dir = prefix.join(artifact.target.as_str()).join("lib");
  std::fs::create_dir_all(&lib_dir)?;
  let dest = lib_dir.join(ARTIFACT_FILE);
  std::fs::copy(&artifact.path, &dest)?;

  let include = prefix.join("include");
  std::fs::create_dir_all(&include)?;
  std::fs::copy(source_dir.join(PUBLIC_HEADER), include.join(PUBLIC_HEADER))?;

  info!(target = %artifact.target, path = %dest.display(), "artifact installed");
  Ok(dest)
}

fn check_file(target: TargetId, path: &Path) -> Result<u64, ArtifactError> {
  let meta = match std::fs::metadata(path) {
    Ok(meta) if meta.is_file() => meta,
    Ok(_) => return Err(ArtifactError::Missing(path.to_path_buf())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ArtifactError::Missing(path.to_path_buf())),
    Err(e) => return Err(e.into()),
  };
  if meta.len() == 0 {
    return Err(ArtifactError::Empty(path.to_path_buf()));
  }

  verify_header(target, path)?;
  Ok(meta.len())
}
