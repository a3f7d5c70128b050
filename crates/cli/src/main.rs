//! prof: manage package profiles over a content-addressed store.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prof_lib::platform::paths::default_profile_path;

use crate::output::{OutputFormat, print_error};

/// Install, remove, upgrade and list packages in a profile
#[derive(Parser)]
#[command(name = "prof")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Profile to operate on (default: $PROF_PROFILE, then the per-user default profile)
  #[arg(long, global = true, value_name = "PATH")]
  profile: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Install packages into the profile
  Install {
    /// Packages to install, as `<reference>#<attribute>` (e.g. `pkgs#hello`)
    #[arg(required = true)]
    installables: Vec<String>,
  },

  /// Remove packages from the profile
  Remove {
    /// Elements to remove: an index, a store path, or an attribute-path pattern
    elements: Vec<String>,
  },

  /// Upgrade packages using the current revision of their source
  Upgrade {
    /// Elements to upgrade: an index, a store path, or an attribute-path pattern
    elements: Vec<String>,
  },

  /// List installed packages
  Info {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let profile = cli.profile.unwrap_or_else(default_profile_path);

  let result = match cli.command {
    Commands::Install { installables } => cmd::cmd_install(&profile, &installables),
    Commands::Remove { elements } => cmd::cmd_remove(&profile, &elements),
    Commands::Upgrade { elements } => cmd::cmd_upgrade(&profile, &elements),
    Commands::Info { output } => cmd::cmd_info(&profile, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
