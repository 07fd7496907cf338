mod args;
mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use args::{BuildArgs, load_config_from_env};
use cmd::exit;
use output::{OutputFormat, Tone, emit};

/// voxb - cross-build speech recognition libraries for every Android ABI
#[derive(Parser)]
#[command(name = "voxb")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// TOML configuration file
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
  output: OutputFormat,

  #[command(flatten)]
  build: BuildArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Check the NDK, tools and sources without building
  Validate,

  /// Build the requested targets
  Build {
    /// Package the output tree after a successful build
    #[arg(long)]
    package: bool,

    /// Cancel the run after this long (e.g. "90m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
  },

  /// Package whatever the output tree holds, without building
  Package,

  /// Show which targets have a valid library in the output tree
  Status,

  /// List known targets and their toolchain settings
  Targets,

  /// Remove the workspaces of the requested targets
  Clean,
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) => {
      // --help and --version land here too and are not failures.
      let _ = err.print();
      return if err.use_stderr() {
        ExitCode::from(exit::USAGE)
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  match run(cli) {
    Ok(code) => code,
    Err(err) => {
      emit(Tone::Failed, &format!("Error: {:#}", err));
      ExitCode::from(exit::code_for(&err))
    }
  }
}

fn run(cli: Cli) -> Result<ExitCode> {
  let config = load_config_from_env(cli.config.as_deref(), &cli.build, cli.verbose)?;
  init_logging(config.verbose);
  let format = cli.output;

  match cli.command {
    Commands::Validate => cmd::cmd_validate(&config, format),
    Commands::Build { package, timeout } => cmd::cmd_build(config, package, timeout, format),
    Commands::Package => cmd::cmd_package(&config, format),
    Commands::Status => cmd::cmd_status(&config, format),
    Commands::Targets => cmd::cmd_targets(&config, format),
    Commands::Clean => cmd::cmd_clean(config, format),
  }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` when `--verbose` or the
/// config file asks for it.
fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}
