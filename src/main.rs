use crate::cmd::completions::completions;
use crate::cmd::install_hook::install_hook;
use crate::cmd::pre_receive::pre_receive;
use crate::cmd::{Cli, Commands, LfsCommand, RepoCommand, SettingsCommand};
use crate::config::FileSettingsStore;
use crate::config::global::SizeGuardGlobalConfig;

mod cmd;
mod config;
mod constants;
mod guard_error;
mod hooks;
mod lfs;
mod policy;
mod repo_size;
mod rules;
mod size;

fn main() {
    let cli_instance = Cli::new();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        match cli_instance.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    ))
    .format_timestamp_secs()
    .init();

    let config_path = cli_instance
        .config
        .clone()
        .unwrap_or_else(SizeGuardGlobalConfig::find_global_config_path);
    let store = FileSettingsStore::new(config_path);

    let result = match cli_instance.command {
        Commands::PreReceive => pre_receive(&store),
        Commands::InstallHook { repo, force } => {
            install_hook(&repo, cli_instance.config.as_deref(), force)
        }
        Commands::Settings(SettingsCommand::Show { repo }) => {
            cmd::settings::show(&store, repo.as_deref())
        }
        Commands::Settings(SettingsCommand::SetGlobal {
            enabled,
            repo_size_limit,
            lfs_size_limit,
            lfs_size_in_repo_size,
            enforcement,
        }) => cmd::settings::set_global(
            &store,
            enabled,
            repo_size_limit,
            lfs_size_limit,
            lfs_size_in_repo_size,
            enforcement,
        ),
        Commands::Repo(RepoCommand::SetSizeLimit { repo, size }) => {
            cmd::repo::set_size_limit(&store, &repo, size)
        }
        Commands::Repo(RepoCommand::SetLfsSizeLimit { repo, size }) => {
            cmd::repo::set_lfs_size_limit(&store, &repo, size)
        }
        Commands::Repo(RepoCommand::ClearLimits { repo }) => cmd::repo::clear_limits(&store, &repo),
        Commands::Repo(RepoCommand::Size { repo }) => cmd::repo::size(&store, &repo),
        Commands::Lfs(LfsCommand::Batch { repo, href_base }) => {
            cmd::lfs::batch(&store, &repo, href_base.as_deref())
        }
        Commands::Lfs(LfsCommand::Upload { repo, oid, size }) => {
            cmd::lfs::upload(&store, &repo, &oid, size)
        }
        Commands::Completions { shell } => {
            completions(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        err.print_error();
        std::process::exit(1);
    }
}
