use serde::{Deserialize, Serialize};

use crate::platform::TargetId;
use crate::stage::{StageError, StageId, StageSpec, StageStatus};

/// Status of one stage as reported after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
  pub id: StageId,
  pub status: StageStatus,
}

/// Mutable per-stage state of one pipeline run.
///
/// Enforces that a stage only starts running once every stage before it is
/// `succeeded` or `skipped-cached`.
#[derive(Debug)]
pub struct PipelineRun {
  target: TargetId,
  records: Vec<StageRecord>,
}

impl PipelineRun {
  pub fn new(target: TargetId, stages: &[StageSpec]) -> Self {
    Self {
      target,
      records: stages
        .iter()
        .map(|s| StageRecord {
          id: s.id,
          status: StageStatus::Pending,
        })
        .collect(),
    }
  }

  pub fn target(&self) -> TargetId {
    self.target
  }

  pub fn begin(&mut self, idx: usize) -> Result<(), StageError> {
    if let Some(blocking) = self.records[..idx].iter().find(|r| !r.status.is_done()) {
      return Err(StageError::InvalidPlan(format!(
        "{} cannot start while {} is {}",
        self.records[idx].id, blocking.id, blocking.status
      )));
    }
    self.set(idx, StageStatus::Running);
    Ok(())
  }

  pub fn skip_cached(&mut self, idx: usize) {
    self.set(idx, StageStatus::SkippedCached);
  }

  pub fn succeed(&mut self, idx: usize) {
    self.set(idx, StageStatus::Succeeded);
  }

  pub fn fail(&mut self, idx: usize) {
    self.set(idx, StageStatus::Failed);
  }

  pub fn into_records(self) -> Vec<StageRecord> {
    self.records
  }

  fn set(&mut self, idx: usize, status: StageStatus) {
    if let Some(record) = self.records.get_mut(idx) {
      record.status = status;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn specs() -> Vec<StageSpec> {
    StageId::ORDER.iter().map(|id| StageSpec::new(*id, "m", "o")).collect()
  }

  #[test]
  fn starts_pending() {
    let run = PipelineRun::new(TargetId::X86, &specs());
    assert_eq!(run.target(), TargetId::X86);
    assert_eq!(run.records.len(), 5);
    assert!(run.records.iter().all(|r| r.status == StageStatus::Pending));
  }

  #[test]
  fn begin_requires_finished_predecessors() {
    let mut run = PipelineRun::new(TargetId::X86, &specs());
    run.skip_cached(0);
    run.succeed(1);
    run.begin(2).unwrap();

    let err = run.begin(4).unwrap_err();
    assert!(err.to_string().contains("transducer is running"));
    assert_eq!(run.records[4].status, StageStatus::Pending);
  }

  #[test]
  fn failed_predecessor_blocks() {
    let mut run = PipelineRun::new(TargetId::X86, &specs());
    run.fail(0);
    assert!(run.begin(1).is_err());
  }
}
