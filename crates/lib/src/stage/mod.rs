//! Stage definitions and the planners that produce them.
//!
//! A stage is one external build step for one target. Its completion is
//! recorded by a marker file inside the target's workspace, which is what
//! makes re-runs skip work already done.

pub mod action;
mod registry;
mod types;

pub use action::{ActionContext, copy_tree, execute_action};
pub use registry::NativeStages;
pub use types::{StageAction, StageError, StageId, StageSpec, StageStatus};

use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// Produces the ordered stage list for one target.
///
/// Implemented by [`NativeStages`] for real builds; closures work too, which
/// is how tests substitute cheap shell actions.
pub trait StagePlanner: Send + Sync {
  fn plan(&self, toolchain: &Toolchain, workspace: &Workspace) -> Vec<StageSpec>;
}

impl<F> StagePlanner for F
where
  F: Fn(&Toolchain, &Workspace) -> Vec<StageSpec> + Send + Sync,
{
  fn plan(&self, toolchain: &Toolchain, workspace: &Workspace) -> Vec<StageSpec> {
    self(toolchain, workspace)
  }
}
