//! Fan-out of target pipelines and aggregation of their results.
//!
//! One task per buildable target, bounded by a semaphore of `jobs` permits.
//! A target's failure is recorded in the report and never affects its
//! siblings; only environment validation can abort the whole run.

mod report;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::artifact::{self, Artifact};
use crate::config::BuildConfig;
use crate::pipeline::TargetPipeline;
use crate::platform::TargetId;
use crate::stage::{NativeStages, StageError, StageId, StagePlanner};
use crate::toolchain::{ToolchainError, ToolchainResolver};
use crate::validate::{EnvironmentError, validate};
use crate::workspace::{LockError, Workspace, WorkspaceLock, WorkspaceRoot};

pub use report::{BuildReport, SkipReason, TargetReport, TargetStatus, Verdict};

/// Errors that abort a run before any target starts.
#[derive(Debug, Error)]
pub enum OrchestrateError {
  #[error(transparent)]
  Environment(#[from] EnvironmentError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error("failed to clean {path}: {source}")]
  Clean {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub struct BuildOrchestrator {
  config: Arc<BuildConfig>,
  planner: Arc<dyn StagePlanner>,
}

impl BuildOrchestrator {
  pub fn new(config: BuildConfig, planner: Arc<dyn StagePlanner>) -> Self {
    Self {
      config: Arc::new(config),
      planner,
    }
  }

  /// Orchestrator using the real third-party build recipes.
  pub fn native(config: BuildConfig) -> Self {
    let planner = Arc::new(NativeStages::from_config(&config));
    Self::new(config, planner)
  }

  pub fn config(&self) -> &BuildConfig {
    &self.config
  }

  /// Validate the environment, then build every requested target.
  pub async fn run_all(&self, cancel: &CancellationToken) -> Result<BuildReport, OrchestrateError> {
    let env = validate(&self.config)?;
    let lock = WorkspaceLock::acquire(&self.config.workspace_root, "build")?;
    debug!(lock = %lock.lock_path().display(), "workspace locked");
    let resolver = Arc::new(ToolchainResolver::from_config(&self.config)?);
    let root = WorkspaceRoot::new(&self.config.workspace_root);

    let mut targets = BTreeMap::new();
    for target in self.config.excluded_targets() {
      targets.insert(target, TargetReport::skipped(target, SkipReason::Excluded));
    }
    for (target, why) in env.dropped {
      targets.insert(target, TargetReport::skipped(target, SkipReason::Dropped(why)));
    }

    info!(targets = env.buildable.len(), jobs = self.config.jobs, "starting target pipelines");

    let semaphore = Arc::new(Semaphore::new(self.config.jobs.max(1)));
    let mut join_set = JoinSet::new();

    for target in &env.buildable {
      let job = TargetJob {
        config: self.config.clone(),
        planner: self.planner.clone(),
        resolver: resolver.clone(),
        workspace: root.partition(*target),
        cancel: cancel.clone(),
      };
      let semaphore = semaphore.clone();
      let span = info_span!("target", target = %target);

      join_set.spawn(
        async move {
          let Ok(_permit) = semaphore.acquire().await else {
            return TargetReport::failed(job.workspace.target(), StageId::first(), "worker pool closed");
          };
          job.run().await
        }
        .instrument(span),
      );
    }

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok(report) => {
          targets.insert(report.target, report);
        }
        Err(e) => error!(error = %e, "target task panicked"),
      }
    }

    // A panicked task leaves its target without a report.
    for target in env.buildable {
      targets
        .entry(target)
        .or_insert_with(|| TargetReport::failed(target, StageId::first(), "build task panicked"));
    }

    let report = BuildReport {
      ndk_revision: env.ndk_revision,
      targets,
    };
    match report.verdict() {
      Verdict::Success => info!("all targets built"),
      Verdict::Partial => warn!(absent = ?report.absent(), "some targets were not built"),
      Verdict::Failure => error!("no target was built"),
    }
    Ok(report)
  }

  /// Remove the workspace partitions of every requested target.
  pub async fn clean(&self) -> Result<Vec<TargetId>, OrchestrateError> {
    let lock = WorkspaceLock::acquire(&self.config.workspace_root, "clean")?;
    debug!(lock = %lock.lock_path().display(), "workspace locked");
    let root = WorkspaceRoot::new(&self.config.workspace_root);

    let mut cleaned = Vec::new();
    for target in self.config.build_targets() {
      let ws = root.partition(target);
      if ws.root().exists() {
        ws.clean().await.map_err(|source| OrchestrateError::Clean {
          path: ws.root().to_path_buf(),
          source,
        })?;
        cleaned.push(target);
      }
    }
    Ok(cleaned)
  }
}

/// Everything one target's task owns.
struct TargetJob {
  config: Arc<BuildConfig>,
  planner: Arc<dyn StagePlanner>,
  resolver: Arc<ToolchainResolver>,
  workspace: Workspace,
  cancel: CancellationToken,
}

impl TargetJob {
  async fn run(self) -> TargetReport {
    let target = self.workspace.target();

    // Resolve first so a missing toolchain costs no workspace.
    let toolchain = match self.resolver.resolve(target) {
      Ok(tc) => tc,
      Err(e) => {
        error!(target = %target, error = %e, "toolchain unavailable");
        return TargetReport::failed(target, StageId::first(), e.to_string());
      }
    };

    // Waiting for a worker may outlast the run; never clean a partition then.
    if self.cancel.is_cancelled() {
      return TargetReport::failed(target, StageId::first(), StageError::Cancelled.to_string());
    }

    if let Err(e) = self.prepare_workspace().await {
      return TargetReport::failed(target, StageId::first(), format!("workspace: {}", e));
    }

    let stages = self.planner.plan(&toolchain, &self.workspace);
    let pipeline = TargetPipeline::new(&toolchain, &self.workspace).with_search_path(self.config.search_path.clone());
    let run = pipeline.run(stages, &self.cancel).await;

    let mut report = TargetReport {
      target,
      status: TargetStatus::Succeeded,
      stages: run.stages,
      artifact: None,
      installed: None,
    };

    if let Some(failure) = run.failure {
      report.status = TargetStatus::Failed {
        stage: failure.stage,
        reason: failure.error.to_string(),
      };
      return report;
    }

    let Some(produced) = run.output else {
      report.status = TargetStatus::Failed {
        stage: StageId::Targetlib,
        reason: "pipeline produced no output".to_string(),
      };
      return report;
    };

    let artifact = match self.collect(produced).await {
      Ok(artifact) => artifact,
      Err(reason) => {
        error!(target = %target, reason = %reason, "artifact rejected");
        report.status = TargetStatus::Failed {
          stage: StageId::Targetlib,
          reason,
        };
        return report;
      }
    };

    if self.config.install {
      match artifact::install(&artifact, &self.config.source_dir, &self.config.install_prefix) {
        Ok(path) => report.installed = Some(path),
        Err(e) => {
          error!(target = %target, error = %e, "install failed");
          // A failed target must not be packaged.
          if let Err(discard_err) = artifact::discard(&self.config.output_root, target) {
            warn!(target = %target, error = %discard_err, "failed to remove staged artifact");
          }
          report.status = TargetStatus::Failed {
            stage: StageId::Targetlib,
            reason: format!("install failed: {}", e),
          };
          return report;
        }
      }
    }

    report.artifact = Some(artifact);
    report
  }

  async fn prepare_workspace(&self) -> std::io::Result<()> {
    if self.config.clean {
      self.workspace.clean().await?;
    }
    self.workspace.prepare().await
  }

  async fn collect(&self, produced: PathBuf) -> Result<Artifact, String> {
    let target = self.workspace.target();
    let output_root = self.config.output_root.clone();
    let run_tests = self.config.run_tests;

    tokio::task::spawn_blocking(move || artifact::collect(target, &produced, &output_root, run_tests))
      .await
      .map_err(|e| format!("artifact task failed: {}", e))?
      .map_err(|e| format!("artifact rejected: {}", e))
  }
}
