use crate::config::SettingsProvider;
use crate::guard_error::GuardError;
use crate::hooks::{hook_git_dir, parse_ref_updates};
use crate::policy::SizeLimitPolicy;
use crate::repo_size::measure_push;
use crate::rules::a01_repo_size_limit::RepoSizeLimit;
use crate::rules::{EnforcementLevel, Rule};
use log::{debug, info};
use std::io::BufRead;
use std::path::Path;

/// Hook entry point. Git has already received the objects into quarantine;
/// an `Err` here makes git refuse every ref in the push.
pub(crate) fn pre_receive(settings: &dyn SettingsProvider) -> Result<(), Box<GuardError>> {
    let git_dir = hook_git_dir()?;
    let stdin = std::io::stdin();
    guard_push(settings, &git_dir, stdin.lock())
}

pub(crate) fn guard_push<R: BufRead>(
    settings: &dyn SettingsProvider,
    git_dir: &Path,
    updates: R,
) -> Result<(), Box<GuardError>> {
    let updates = parse_ref_updates(updates)?;
    for update in &updates {
        debug!("{}: {} -> {}", update.refname, update.old, update.new);
    }
    let limits = SizeLimitPolicy::for_repository(settings, git_dir)?;

    if !limits.repo_limit.is_enforced() || limits.enforcement == EnforcementLevel::Skip {
        debug!("No repository limit for {}, accepting push", git_dir.display());
        return Ok(());
    }

    let transfer = measure_push(git_dir, &updates, limits.lfs_counts_in_repo)?;
    let rule = RepoSizeLimit::new(&git_dir.display().to_string(), limits, transfer);
    let within_limit = rule.execute()?;

    info!(
        "Accepted push to {} ({} incoming bytes{})",
        git_dir.display(),
        transfer.incoming_object_size_bytes,
        if within_limit { "" } else { ", over the soft limit" }
    );
    Ok(())
}
