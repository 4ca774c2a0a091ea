//! CLI argument definitions using clap derive

use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// npm-install - dependency installation for Node.js application builds
///
/// Selects install, ci or rebuild for a project, skips work whose inputs
/// are unchanged, and publishes node_modules through relocatable links.
#[derive(Parser, Debug)]
#[command(name = "npm-install")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install project dependencies into layers
    Build(BuildArgs),

    /// Repoint application links at a launch layer
    SetupSymlinks(SetupSymlinksArgs),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
#[command(group(
    ArgGroup::new("plan")
        .required(true)
        .multiple(true)
        .args(["build", "launch"])
))]
pub struct BuildArgs {
    /// Application source directory
    #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
    pub app_dir: PathBuf,

    /// Directory holding the layers
    #[arg(long, env = "CNB_LAYERS_DIR")]
    pub layers_dir: PathBuf,

    /// Produce modules for later build steps
    #[arg(long)]
    pub build: bool,

    /// Produce modules for the runtime image
    #[arg(long)]
    pub launch: bool,

    /// Root for link indirections (defaults to the system temp directory)
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,

    /// Configuration descriptor replacing the built-in one
    #[arg(long)]
    pub descriptor: Option<PathBuf>,
}

/// Arguments for the setup-symlinks command
#[derive(Parser, Debug)]
pub struct SetupSymlinksArgs {
    /// Application directory
    #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
    pub app_dir: PathBuf,

    /// Launch layer holding node_modules
    #[arg(long)]
    pub layer: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_requires_a_plan() {
        let err = Cli::try_parse_from(["npm-install", "build", "--layers-dir", "/layers"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn build_parses_flags() {
        let cli = Cli::try_parse_from([
            "npm-install",
            "-vv",
            "build",
            "--app-dir",
            "/workspace",
            "--layers-dir",
            "/layers",
            "--build",
            "--launch",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.app_dir, PathBuf::from("/workspace"));
                assert!(args.build && args.launch);
                assert!(args.tmp_dir.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
