use crate::size::parse_size;
use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

pub(crate) mod completions;
pub(crate) mod install_hook;
pub(crate) mod lfs;
pub(crate) mod pre_receive;
pub(crate) mod repo;
pub(crate) mod settings;

#[derive(Parser, Debug)]
#[command(
    name = "sizeguard",
    version,
    about = "Enforce repository and LFS size limits on git pushes and LFS uploads"
)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Global config file (defaults to $SIZEGUARD_CONFIG or the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Git pre-receive hook entry point; reads ref updates on stdin
    PreReceive,
    /// Install the pre-receive hook into a repository
    InstallHook {
        repo: PathBuf,
        /// Replace a pre-receive hook that sizeguard did not install
        #[arg(long)]
        force: bool,
    },
    /// Instance-wide defaults
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Per-repository overrides and usage
    #[command(subcommand)]
    Repo(RepoCommand),
    /// LFS batch and upload gate
    #[command(subcommand)]
    Lfs(LfsCommand),
    /// Print shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
pub(crate) enum SettingsCommand {
    /// Show the global setting, and the effective limits of a repository
    Show {
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// Replace the global repository setting
    SetGlobal {
        #[arg(long, action = ArgAction::Set)]
        enabled: bool,
        /// Bytes or a size such as 64KiB; 0 or -1 disables
        #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
        repo_size_limit: i64,
        /// Bytes or a size such as 64KiB; 0 or -1 disables
        #[arg(long, value_parser = parse_size, allow_hyphen_values = true)]
        lfs_size_limit: i64,
        #[arg(long, action = ArgAction::Set)]
        lfs_size_in_repo_size: bool,
        /// Keeps the current level when omitted
        #[arg(long, value_enum)]
        enforcement: Option<crate::rules::EnforcementLevel>,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum RepoCommand {
    /// Override the repository size limit (0 falls back to the global default)
    SetSizeLimit {
        repo: PathBuf,
        #[arg(value_parser = parse_size, allow_hyphen_values = true)]
        size: i64,
    },
    /// Override the LFS size limit (0 falls back to the global default)
    SetLfsSizeLimit {
        repo: PathBuf,
        #[arg(value_parser = parse_size, allow_hyphen_values = true)]
        size: i64,
    },
    /// Drop both overrides
    ClearLimits { repo: PathBuf },
    /// Report current git and LFS usage
    Size { repo: PathBuf },
}

#[derive(Subcommand, Debug)]
pub(crate) enum LfsCommand {
    /// Answer a batch request read from stdin
    Batch {
        repo: PathBuf,
        /// Prefix for action hrefs (defaults to [lfs] href_base)
        #[arg(long)]
        href_base: Option<String>,
    },
    /// Store one object read from stdin
    Upload {
        repo: PathBuf,
        oid: String,
        #[arg(allow_hyphen_values = true)]
        size: i64,
    },
}

impl Cli {
    pub(crate) fn new() -> Self {
        Cli::parse()
    }
}
