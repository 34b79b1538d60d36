use crate::config::local::open_git_dir;
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use crate::hooks::install_pre_receive_hook;
use colored::Colorize;
use std::path::Path;

/// Point the repository's pre-receive hook at this binary. `config` is baked
/// into the hook only when given explicitly, otherwise the hook resolves the
/// config path the same way every other command does.
pub(crate) fn install_hook(
    repo: &Path,
    config: Option<&Path>,
    force: bool,
) -> Result<(), Box<GuardError>> {
    let git_dir = open_git_dir(repo)?;
    let exe = std::env::current_exe().map_err(|e| {
        Box::new(GuardError::new(
            "Failed to locate sizeguard binary",
            &e.to_string(),
            GuardErrorWorkflowType::Hook,
            &git_dir.display().to_string(),
            NO_CHECK,
        ))
    })?;
    let config = match config {
        Some(path) if path.is_relative() => Some(
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        ),
        Some(path) => Some(path.to_path_buf()),
        None => None,
    };

    let hook_path = install_pre_receive_hook(&git_dir, &exe, config.as_deref(), force)?;
    println!(
        "{} pre-receive hook at {}",
        "Installed".green().bold(),
        hook_path.display()
    );
    Ok(())
}
