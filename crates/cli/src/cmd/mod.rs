mod build;
mod clean;
pub mod exit;
mod package;
mod status;
mod targets;
mod validate;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use package::cmd_package;
pub use status::cmd_status;
pub use targets::cmd_targets;
pub use validate::cmd_validate;
