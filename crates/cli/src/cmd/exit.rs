//! Process exit codes.

use voxbuild_lib::orchestrate::OrchestrateError;
use voxbuild_lib::package::PackagingError;
use voxbuild_lib::validate::EnvironmentError;

/// Usage, configuration or internal error.
pub const USAGE: u8 = 1;
/// Environment validation failed; nothing was built.
pub const ENVIRONMENT: u8 = 3;
/// No target was built.
pub const BUILD: u8 = 4;
/// Packaging failed.
pub const PACKAGING: u8 = 5;

/// Exit code for an error that escaped a command.
pub fn code_for(err: &anyhow::Error) -> u8 {
  if let Some(e) = err.downcast_ref::<OrchestrateError>() {
    return match e {
      OrchestrateError::Environment(_) => ENVIRONMENT,
      _ => USAGE,
    };
  }
  if err.downcast_ref::<EnvironmentError>().is_some() {
    return ENVIRONMENT;
  }
  if err.downcast_ref::<PackagingError>().is_some() {
    return PACKAGING;
  }
  USAGE
}
