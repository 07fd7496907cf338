//! Distribution packaging of the canonical output tree.
//!
//! The package is a zip with one `jni/<target>/libvosk.so` entry per present
//! artifact plus a `manifest.json`. Partial packages are valid; only an empty
//! output tree is an error.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::artifact::{self, Artifact};
use crate::config::{BuildConfig, BuildType};
use crate::consts::{ARTIFACT_FILE, PACKAGE_MANIFEST};
use crate::platform::TargetId;
use crate::util::hash::ContentHash;

#[derive(Debug, Error)]
pub enum PackagingError {
  #[error("no valid artifacts in {output_root} (requested: {})", format_targets(.requested))]
  NothingToPackage {
    output_root: PathBuf,
    requested: Vec<TargetId>,
  },

  #[error("failed to write archive: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("failed to encode manifest: {0}")]
  Manifest(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// One artifact as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
  pub target: TargetId,
  /// Path of the entry inside the archive.
  pub file: String,
  pub size: u64,
  pub sha256: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
  pub name: String,
  pub version: String,
  pub build_type: BuildType,
  pub included: Vec<TargetId>,
  pub missing: Vec<TargetId>,
  pub artifacts: Vec<ManifestEntry>,
}

impl PackageManifest {
  pub fn is_partial(&self) -> bool {
    !self.missing.is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct Package {
  pub path: PathBuf,
  pub manifest: PackageManifest,
}

/// Builds packages named after the configured package identity.
#[derive(Debug, Clone)]
pub struct Packager {
  name: String,
  version: String,
  build_type: BuildType,
  package_dir: PathBuf,
}

impl Packager {
  pub fn new(name: impl Into<String>, version: impl Into<String>, package_dir: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      build_type: BuildType::default(),
      package_dir: package_dir.into(),
    }
  }

  pub fn from_config(config: &BuildConfig) -> Self {
    Self::new(&config.package_name, &config.package_version, &config.package_dir).with_build_type(config.build_type)
  }

  pub fn with_build_type(mut self, build_type: BuildType) -> Self {
    self.build_type = build_type;
    self
  }

  /// Final location of the archive.
  pub fn package_path(&self) -> PathBuf {
    self.package_dir.join(format!("{}-{}.zip", self.name, self.version))
  }

  /// Package every valid artifact under `output_root`.
  ///
  /// Requested targets without an artifact are listed as missing; artifacts
  /// that fail re-verification are left out.
  pub fn package(&self, output_root: &Path, requested: &[TargetId]) -> Result<Package, PackagingError> {
    let mut present: Vec<Artifact> = Vec::new();
    for (target, result) in artifact::scan(output_root) {
      match result {
        Ok(Some(found)) => present.push(found),
        Ok(None) => {}
        Err(e) => warn!(target = %target, error = %e, "ignoring invalid artifact"),
      }
    }

    if present.is_empty() {
      return Err(PackagingError::NothingToPackage {
        output_root: output_root.to_path_buf(),
        requested: requested.to_vec(),
      });
    }

    let included: Vec<TargetId> = present.iter().map(|a| a.target).collect();
    let mut missing: Vec<TargetId> = requested.iter().filter(|t| !included.contains(*t)).copied().collect();
    missing.sort();
    missing.dedup();

    if !missing.is_empty() {
      warn!(missing = %format_targets(&missing), "packaging without all requested targets");
    }

    let manifest = PackageManifest {
      name: self.name.clone(),
      version: self.version.clone(),
      build_type: self.build_type,
      included,
      missing,
      artifacts: present
        .iter()
        .map(|a| ManifestEntry {
          target: a.target,
          file: entry_name(a.target),
          size: a.size,
          sha256: a.sha256.clone(),
        })
        .collect(),
    };

    let path = self.write_archive(&present, &manifest)?;
    info!(path = %path.display(), included = %format_targets(&manifest.included), "package written");

    Ok(Package { path, manifest })
  }

  fn write_archive(&self, artifacts: &[Artifact], manifest: &PackageManifest) -> Result<PathBuf, PackagingError> {
    std::fs::create_dir_all(&self.package_dir)?;
    let staged = NamedTempFile::new_in(&self.package_dir)?;

    let mut zip = ZipWriter::new(staged.reopen()?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for artifact in artifacts {
      zip.start_file(entry_name(artifact.target), options)?;
      io::copy(&mut File::open(&artifact.path)?, &mut zip)?;
    }

    zip.start_file(PACKAGE_MANIFEST, options)?;
    zip.write_all(&serde_json::to_vec_pretty(manifest)?)?;
    zip.finish()?.sync_all()?;

    let dest = self.package_path();
    staged.persist(&dest).map_err(|e| PackagingError::Io(e.error))?;
    Ok(dest)
  }
}

fn entry_name(target: TargetId) -> String {
  format!("jni/{}/{}", target.as_str(), ARTIFACT_FILE)
}

fn format_targets(targets: &[TargetId]) -> String {
  targets.iter().map(TargetId::as_str).collect::<Vec<_>>().join(", ")
}
