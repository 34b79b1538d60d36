use crate::config::SettingsProvider;
use crate::config::local::open_git_dir;
use crate::guard_error::GuardError;
use crate::policy::SizeLimitPolicy;
use crate::repo_size::{current_git_size, current_lfs_size};
use crate::size::{format_limit, format_size};
use colored::Colorize;
use std::path::Path;

pub(crate) fn set_size_limit(
    settings: &dyn SettingsProvider,
    repo: &Path,
    limit: i64,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    settings.set_repo_size_limit(&git_dir, limit)?;
    println!(
        "{} repository size limit of {} to {}",
        "Set".green().bold(),
        git_dir.display(),
        format_limit(limit)
    );
    Ok(())
}

pub(crate) fn set_lfs_size_limit(
    settings: &dyn SettingsProvider,
    repo: &Path,
    limit: i64,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    settings.set_repo_lfs_size_limit(&git_dir, limit)?;
    println!(
        "{} LFS size limit of {} to {}",
        "Set".green().bold(),
        git_dir.display(),
        format_limit(limit)
    );
    Ok(())
}

pub(crate) fn clear_limits(
    settings: &dyn SettingsProvider,
    repo: &Path,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    settings.clear_repo_limits(&git_dir)?;
    println!(
        "{} size limit overrides of {}",
        "Cleared".green().bold(),
        git_dir.display()
    );
    Ok(())
}

/// Print on-disk usage next to the limits that currently apply.
pub(crate) fn size(settings: &dyn SettingsProvider, repo: &Path) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    let git = current_git_size(&git_dir)?;
    let lfs = current_lfs_size(&git_dir)?;
    let limits = SizeLimitPolicy::for_repository(settings, &git_dir)?;
    let counted = if limits.lfs_counts_in_repo {
        git.saturating_add(lfs)
    } else {
        git
    };

    println!("{}", git_dir.display().to_string().bold());
    println!("  git objects:   {} ({} bytes)", format_size(git), git);
    println!("  lfs objects:   {} ({} bytes)", format_size(lfs), lfs);
    println!("  counted size:  {} ({} bytes)", format_size(counted), counted);
    println!("  repo limit:    {}", limits.repo_limit);
    println!("  lfs limit:     {}", limits.lfs_limit);
    Ok(())
}
