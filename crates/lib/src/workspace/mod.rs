//! Per-target workspace partitions.
//!
//! The orchestrator owns a [`WorkspaceRoot`] and hands every target pipeline
//! its own [`Workspace`] handle. Stages derive every path they touch from that
//! handle, so two targets never write into each other's partition.

mod lock;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::platform::TargetId;

pub use lock::{LockError, LockMetadata, WorkspaceLock};

/// Directory holding one partition per target.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
  root: PathBuf,
}

impl WorkspaceRoot {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Allocate the handle for `target`'s partition.
  pub fn partition(&self, target: TargetId) -> Workspace {
    Workspace {
      target,
      root: self.root.join(target.as_str()),
    }
  }
}

/// Handle to one target's scratch area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
  target: TargetId,
  root: PathBuf,
}

impl Workspace {
  pub fn target(&self) -> TargetId {
    self.target
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Resolve a workspace-relative path inside this partition.
  pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.root.join(relative)
  }

  /// Third-party source checkouts.
  pub fn src_dir(&self) -> PathBuf {
    self.path("src")
  }

  /// Install prefix shared by the library stages of this target.
  pub fn local_dir(&self) -> PathBuf {
    self.path("local")
  }

  pub fn tmp_dir(&self) -> PathBuf {
    self.path("tmp")
  }

  /// Create the partition skeleton. Existing content is kept.
  pub async fn prepare(&self) -> std::io::Result<()> {
    for dir in [self.src_dir(), self.local_dir().join("lib"), self.local_dir().join("include"), self.tmp_dir()] {
      tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
  }

  /// Remove the whole partition, discarding every cached stage.
  pub async fn clean(&self) -> std::io::Result<()> {
    if tokio::fs::try_exists(&self.root).await? {
      info!(target = %self.target, path = %self.root.display(), "cleaning workspace");
      tokio::fs::remove_dir_all(&self.root).await?;
    }
    Ok(())
  }
}
