use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::toolchain::ToolchainError;

/// The five pipeline steps, in their mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
  Mathlib,
  Linalg,
  Transducer,
  Recognizer,
  Targetlib,
}

impl StageId {
  pub const ORDER: [StageId; 5] = [
    Self::Mathlib,
    Self::Linalg,
    Self::Transducer,
    Self::Recognizer,
    Self::Targetlib,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Mathlib => "mathlib",
      Self::Linalg => "linalg",
      Self::Transducer => "transducer",
      Self::Recognizer => "recognizer",
      Self::Targetlib => "targetlib",
    }
  }

  /// The stage a target fails at when it never got a pipeline.
  pub fn first() -> StageId {
    Self::ORDER[0]
  }
}

impl fmt::Display for StageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Lifecycle of one stage within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
  Pending,
  SkippedCached,
  Running,
  Succeeded,
  Failed,
}

impl StageStatus {
  /// Whether downstream stages may start after this one.
  pub fn is_done(&self) -> bool {
    matches!(self, Self::SkippedCached | Self::Succeeded)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::SkippedCached => "skipped-cached",
      Self::Running => "running",
      Self::Succeeded => "succeeded",
      Self::Failed => "failed",
    }
  }
}

impl fmt::Display for StageStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One step of a stage's build action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageAction {
  /// Shell command run with the target's toolchain exported.
  Cmd {
    cmd: String,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
  },
  /// Recursive copy performed in-process.
  CopyTree { from: PathBuf, to: PathBuf },
}

impl StageAction {
  pub fn cmd(cmd: impl Into<String>) -> Self {
    Self::Cmd {
      cmd: cmd.into(),
      env: BTreeMap::new(),
      cwd: None,
    }
  }

  pub fn cmd_in(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self::Cmd {
      cmd: cmd.into(),
      env: BTreeMap::new(),
      cwd: Some(cwd.into()),
    }
  }

  /// Add environment variables to a `Cmd`; no-op for other actions.
  pub fn with_env(mut self, vars: &BTreeMap<String, String>) -> Self {
    if let Self::Cmd { env, .. } = &mut self {
      env.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    self
  }
}

/// Definition of one stage for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
  pub id: StageId,
  /// Workspace-relative file whose presence means the stage is complete.
  pub marker: PathBuf,
  /// Workspace-relative path downstream stages consume.
  pub output: PathBuf,
  /// Stages whose outputs must exist before this one may run.
  pub inputs: Vec<StageId>,
  pub actions: Vec<StageAction>,
}

impl StageSpec {
  pub fn new(id: StageId, marker: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
    Self {
      id,
      marker: marker.into(),
      output: output.into(),
      inputs: Vec::new(),
      actions: Vec::new(),
    }
  }

  pub fn with_inputs(mut self, inputs: &[StageId]) -> Self {
    self.inputs = inputs.to_vec();
    self
  }

  pub fn with_actions(mut self, actions: Vec<StageAction>) -> Self {
    self.actions = actions;
    self
  }
}

/// Target-scoped failures of a single stage.
#[derive(Debug, Error)]
pub enum StageError {
  #[error("toolchain unavailable: {0}")]
  Toolchain(#[from] ToolchainError),

  #[error("{stage} needs {upstream}, but its output {marker} is missing")]
  DependencyMissing {
    stage: StageId,
    upstream: StageId,
    marker: PathBuf,
  },

  #[error("command failed with exit code {code:?}: {cmd}\n{stderr}")]
  BuildAction {
    cmd: String,
    code: Option<i32>,
    /// Tail of the tool's stderr, kept verbatim.
    stderr: String,
  },

  #[error("{stage} finished but did not produce {marker}")]
  MarkerMissing { stage: StageId, marker: PathBuf },

  #[error("cancelled")]
  Cancelled,

  #[error("invalid stage plan: {0}")]
  InvalidPlan(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
