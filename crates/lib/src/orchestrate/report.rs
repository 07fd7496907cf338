use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::pipeline::StageRecord;
use crate::platform::TargetId;
use crate::stage::StageId;

/// Why a target did not get a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum SkipReason {
  /// Explicitly excluded by the caller.
  Excluded,
  /// Dropped by the validator under `force`.
  Dropped(String),
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Excluded => write!(f, "excluded"),
      Self::Dropped(why) => write!(f, "{}", why),
    }
  }
}

/// Terminal state of one requested target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum TargetStatus {
  Succeeded,
  Failed { stage: StageId, reason: String },
  Skipped { reason: SkipReason },
}

impl TargetStatus {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Succeeded)
  }

  pub fn is_excluded(&self) -> bool {
    matches!(
      self,
      Self::Skipped {
        reason: SkipReason::Excluded
      }
    )
  }
}

/// `succeeded`, `failed:<stage>:<reason>` or `skipped`.
impl fmt::Display for TargetStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Succeeded => write!(f, "succeeded"),
      Self::Failed { stage, reason } => {
        let first_line = reason.lines().next().unwrap_or_default();
        write!(f, "failed:{}:{}", stage, first_line)
      }
      Self::Skipped { .. } => write!(f, "skipped"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
  pub target: TargetId,
  #[serde(flatten)]
  pub status: TargetStatus,
  pub stages: Vec<StageRecord>,
  pub artifact: Option<Artifact>,
  pub installed: Option<PathBuf>,
}

impl TargetReport {
  pub fn skipped(target: TargetId, reason: SkipReason) -> Self {
    Self {
      target,
      status: TargetStatus::Skipped { reason },
      stages: Vec::new(),
      artifact: None,
      installed: None,
    }
  }

  pub fn failed(target: TargetId, stage: StageId, reason: impl Into<String>) -> Self {
    Self {
      target,
      status: TargetStatus::Failed {
        stage,
        reason: reason.into(),
      },
      stages: Vec::new(),
      artifact: None,
      installed: None,
    }
  }
}

/// Overall outcome of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
  /// Every non-excluded target succeeded.
  Success,
  /// At least one target succeeded, some did not.
  Partial,
  /// No target succeeded.
  Failure,
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Success => write!(f, "success"),
      Self::Partial => write!(f, "partial success"),
      Self::Failure => write!(f, "failure"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
  pub ndk_revision: String,
  pub targets: BTreeMap<TargetId, TargetReport>,
}

impl BuildReport {
  pub fn succeeded(&self) -> Vec<TargetId> {
    self.filter(|r| r.status.is_success())
  }

  /// Targets that were meant to be built but produced no artifact.
  pub fn absent(&self) -> Vec<TargetId> {
    self.filter(|r| !r.status.is_success() && !r.status.is_excluded())
  }

  /// Targets the caller asked for, minus explicit exclusions.
  pub fn requested(&self) -> Vec<TargetId> {
    self.filter(|r| !r.status.is_excluded())
  }

  pub fn verdict(&self) -> Verdict {
    if self.succeeded().is_empty() {
      Verdict::Failure
    } else if self.absent().is_empty() {
      Verdict::Success
    } else {
      Verdict::Partial
    }
  }

  fn filter(&self, pred: impl Fn(&TargetReport) -> bool) -> Vec<TargetId> {
    self.targets.values().filter(|r| pred(r)).map(|r| r.target).collect()
  }
}
