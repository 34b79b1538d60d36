use crate::config::FileSettingsStore;
use crate::config::SettingsProvider;
use crate::config::global::GlobalRepositorySetting;
use crate::config::local::open_git_dir;
use crate::guard_error::GuardError;
use crate::policy::SizeLimitPolicy;
use crate::rules::EnforcementLevel;
use crate::size::format_limit;
use clap::ValueEnum;
use colored::Colorize;
use log::info;
use std::path::Path;

fn level_name(level: EnforcementLevel) -> String {
    level
        .to_possible_value()
        .map(|value| value.get_name().to_string())
        .unwrap_or_default()
}

fn format_override(value: Option<i64>) -> String {
    match value {
        None => "not set".to_string(),
        Some(0) => "0 (global default)".to_string(),
        Some(limit) => format_limit(limit),
    }
}

pub(crate) fn show(store: &FileSettingsStore, repo: Option<&Path>) -> Result<(), Box<GuardError>> {
    let config = store.global_config()?;
    let global = &config.repository;

    println!(
        "{} ({})",
        "Global settings".bold(),
        store.global_path().display()
    );
    println!("  enabled:               {}", global.enabled);
    println!("  repo size limit:       {}", format_limit(global.repo_size_limit));
    println!("  lfs size limit:        {}", format_limit(global.lfs_size_limit));
    println!("  lfs in repo size:      {}", global.lfs_size_in_repo_size);
    println!("  enforcement:           {}", level_name(global.enforcement));
    println!("  lfs href base:         {}", config.lfs.href_base);

    if let Some(repo) = repo {
        let git_dir = open_git_dir(repo)?;
        let repo_override = store.repo_override(&git_dir)?;
        let limits = SizeLimitPolicy::resolve(global, &repo_override);

        println!();
        println!("{} ({})", "Repository".bold(), git_dir.display());
        println!(
            "  repo size override:    {}",
            format_override(repo_override.repo_size_limit)
        );
        println!(
            "  lfs size override:     {}",
            format_override(repo_override.lfs_size_limit)
        );
        println!("  effective repo limit:  {}", limits.repo_limit);
        println!("  effective lfs limit:   {}", limits.lfs_limit);
        println!("  enforcement:           {}", level_name(limits.enforcement));
    }
    Ok(())
}

pub(crate) fn set_global(
    store: &FileSettingsStore,
    enabled: bool,
    repo_size_limit: i64,
    lfs_size_limit: i64,
    lfs_size_in_repo_size: bool,
    enforcement: Option<EnforcementLevel>,
) -> Result<(), Box<GuardError>> {
    let enforcement = match enforcement {
        Some(level) => level,
        None => store.global_setting()?.enforcement,
    };
    let setting = GlobalRepositorySetting {
        enabled,
        repo_size_limit,
        lfs_size_limit,
        lfs_size_in_repo_size,
        enforcement,
    };
    store.save_global_setting(&setting)?;
    info!("Saved global setting to {}", store.global_path().display());
    println!(
        "{} global setting: enabled={} repo={} lfs={} lfs_in_repo={} enforcement={}",
        "Saved".green().bold(),
        setting.enabled,
        format_limit(setting.repo_size_limit),
        format_limit(setting.lfs_size_limit),
        setting.lfs_size_in_repo_size,
        level_name(setting.enforcement)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_match_cli_values() {
        assert_eq!(level_name(EnforcementLevel::Skip), "skip");
        assert_eq!(level_name(EnforcementLevel::Warning), "warning");
        assert_eq!(level_name(EnforcementLevel::Error), "error");
    }

    #[test]
    fn test_format_override() {
        assert_eq!(format_override(None), "not set");
        assert_eq!(format_override(Some(0)), "0 (global default)");
        assert_eq!(format_override(Some(-1)), "unlimited (-1)");
        assert_eq!(format_override(Some(2048)), "2 KiB");
    }
}
