//! Sequential execution of one target's stages.
//!
//! A [`TargetPipeline`] walks the stage list in order, skipping stages whose
//! marker already exists and stopping at the first failure. It never retries;
//! re-running the pipeline resumes from the first stage without a marker.

mod run;

use std::ffi::OsString;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::platform::TargetId;
use crate::stage::{ActionContext, StageError, StageId, StageSpec, execute_action};
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

pub use run::{PipelineRun, StageRecord};

/// The first failure of a pipeline run.
#[derive(Debug)]
pub struct StageFailure {
  pub stage: StageId,
  pub error: StageError,
}

/// Final state of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
  pub target: TargetId,
  pub stages: Vec<StageRecord>,
  pub failure: Option<StageFailure>,
  /// Absolute path of the last stage's output, set on success.
  pub output: Option<PathBuf>,
}

impl PipelineReport {
  pub fn succeeded(&self) -> bool {
    self.failure.is_none() && self.stages.iter().all(|s| s.status.is_done())
  }
}

/// Runs the stages of one target inside that target's workspace.
pub struct TargetPipeline<'a> {
  toolchain: &'a Toolchain,
  workspace: &'a Workspace,
  search_path: Option<OsString>,
}

impl<'a> TargetPipeline<'a> {
  pub fn new(toolchain: &'a Toolchain, workspace: &'a Workspace) -> Self {
    Self {
      toolchain,
      workspace,
      search_path: None,
    }
  }

  /// PATH handed to every spawned command.
  pub fn with_search_path(mut self, path: Option<OsString>) -> Self {
    self.search_path = path;
    self
  }

  pub async fn run(&self, stages: Vec<StageSpec>, cancel: &CancellationToken) -> PipelineReport {
    let target = self.workspace.target();
    let mut run = PipelineRun::new(target, &stages);

    let failure = match self.drive(&stages, &mut run, cancel).await {
      Ok(()) => None,
      Err((idx, err)) => {
        run.fail(idx);
        let stage = stages.get(idx).map(|s| s.id).unwrap_or(StageId::first());
        error!(target = %target, stage = %stage, error = %err, "stage failed");
        Some(StageFailure { stage, error: err })
      }
    };

    let output = match (&failure, stages.last()) {
      (None, Some(last)) => Some(self.workspace.path(&last.output)),
      _ => None,
    };

    PipelineReport {
      target,
      stages: run.into_records(),
      failure,
      output,
    }
  }

  async fn drive(
    &self,
    stages: &[StageSpec],
    run: &mut PipelineRun,
    cancel: &CancellationToken,
  ) -> Result<(), (usize, StageError)> {
    check_plan(stages).map_err(|e| (0, e))?;

    let ctx = ActionContext {
      env: self.toolchain.env(),
      default_cwd: self.workspace.root().to_path_buf(),
      tmp_dir: self.workspace.tmp_dir(),
      search_path: self.search_path.clone(),
    };

    for (idx, spec) in stages.iter().enumerate() {
      if cancel.is_cancelled() {
        return Err((idx, StageError::Cancelled));
      }

      let marker = self.workspace.path(&spec.marker);
      if marker.exists() {
        info!(target = %run.target(), stage = %spec.id, "stage cached");
        run.skip_cached(idx);
        continue;
      }

      for input in &spec.inputs {
        // check_plan guarantees every input names an earlier stage.
        let Some(upstream) = stages.iter().find(|s| s.id == *input) else {
          continue;
        };
        let upstream_marker = self.workspace.path(&upstream.marker);
        if !upstream_marker.exists() {
          return Err((
            idx,
            StageError::DependencyMissing {
              stage: spec.id,
              upstream: *input,
              marker: upstream_marker,
            },
          ));
        }
      }

      run.begin(idx).map_err(|e| (idx, e))?;
      info!(target = %run.target(), stage = %spec.id, "stage started");

      for action in &spec.actions {
        execute_action(action, &ctx, cancel).await.map_err(|e| (idx, e))?;
      }

      if !marker.exists() {
        return Err((
          idx,
          StageError::MarkerMissing {
            stage: spec.id,
            marker,
          },
        ));
      }

      run.succeed(idx);
      info!(target = %run.target(), stage = %spec.id, "stage succeeded");
    }

    Ok(())
  }
}

/// Stages must appear in pipeline order and only depend on earlier stages.
fn check_plan(stages: &[StageSpec]) -> Result<(), StageError> {
  for pair in stages.windows(2) {
    if pair[0].id >= pair[1].id {
      return Err(StageError::InvalidPlan(format!(
        "{} is listed after {}",
        pair[1].id, pair[0].id
      )));
    }
  }

  for (idx, spec) in stages.iter().enumerate() {
    for input in &spec.inputs {
      if !stages[..idx].iter().any(|s| s.id == *input) {
        return Err(StageError::InvalidPlan(format!(
          "{} depends on {}, which does not run before it",
          spec.id, input
        )));
      }
    }
  }

  Ok(())
}
