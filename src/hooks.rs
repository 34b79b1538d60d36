use crate::constants::HOOK_MARKER;
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK, NO_REPO};
use git2::{Oid, Repository};
use log::debug;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// One `<old> <new> <ref>` line handed to `pre-receive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RefUpdate {
    pub old: Oid,
    pub new: Oid,
    pub refname: String,
}

impl RefUpdate {
    pub(crate) fn is_delete(&self) -> bool {
        self.new.is_zero()
    }
}

fn hook_error(name: &str, message: &str, repo: &str) -> Box<GuardError> {
    Box::new(GuardError::new(
        name,
        message,
        GuardErrorWorkflowType::Hook,
        repo,
        NO_CHECK,
    ))
}

pub(crate) fn parse_ref_updates<R: BufRead>(reader: R) -> Result<Vec<RefUpdate>, Box<GuardError>> {
    let mut updates = Vec::new();
    for line in reader.lines() {
        let line = line
            .map_err(|e| hook_error("Failed to read ref updates", &e.to_string(), NO_REPO))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(hook_error(
                "Malformed ref update",
                &format!("Expected '<old> <new> <ref>', got '{line}'"),
                NO_REPO,
            ));
        }
        let parse_oid = |s: &str| {
            Oid::from_str(s).map_err(|e| {
                hook_error(
                    "Malformed ref update",
                    &format!("'{s}' is not an object id: {e}"),
                    NO_REPO,
                )
            })
        };
        updates.push(RefUpdate {
            old: parse_oid(parts[0])?,
            new: parse_oid(parts[1])?,
            refname: parts[2].to_string(),
        });
    }
    debug!("Received {} ref update(s)", updates.len());
    Ok(updates)
}

/// Git directory a hook runs for: `$GIT_DIR` (relative to the working
/// directory git starts hooks in), else the working directory itself.
pub(crate) fn hook_git_dir() -> Result<PathBuf, Box<GuardError>> {
    let cwd = std::env::current_dir().map_err(|e| {
        hook_error("Failed to get current directory", &e.to_string(), NO_REPO)
    })?;
    let git_dir = match std::env::var_os("GIT_DIR") {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let git_dir = git_dir.canonicalize().unwrap_or(git_dir);
    debug!("Hook running for {}", git_dir.display());
    Ok(git_dir)
}

/// `core.hooksPath` of the repository if set, else `<git_dir>/hooks`.
pub(crate) fn resolve_hooks_dir(repo: &Repository) -> PathBuf {
    if let Ok(cfg) = repo.config()
        && let Ok(val) = cfg.get_string("core.hooksPath")
    {
        return normalize_hooks_path(repo, &val);
    }
    repo.path().join("hooks")
}

fn normalize_hooks_path(repo: &Repository, configured: &str) -> PathBuf {
    let expanded = if let Some(rest) = configured.strip_prefix("~/") {
        if let Some(home_dir) = home::home_dir() {
            home_dir.join(rest)
        } else {
            PathBuf::from(configured)
        }
    } else {
        PathBuf::from(configured)
    };
    if expanded.is_absolute() {
        expanded
    } else {
        // Relative hook paths resolve against the work tree, or the git
        // directory for bare repositories.
        let base = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());
        base.join(expanded)
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn hook_script(exe: &Path, config: Option<&Path>) -> String {
    let mut command = format!("exec {}", shell_quote(&exe.display().to_string()));
    if let Some(config) = config {
        command.push_str(&format!(
            " --config {}",
            shell_quote(&config.display().to_string())
        ));
    }
    command.push_str(" pre-receive");
    format!("#!/bin/sh\n{HOOK_MARKER}\n{command}\n")
}

/// Write a `pre-receive` hook that hands control to `exe`.
///
/// An existing hook is only replaced when we installed it or `force` is set.
pub(crate) fn install_pre_receive_hook(
    git_dir: &Path,
    exe: &Path,
    config: Option<&Path>,
    force: bool,
) -> Result<PathBuf, Box<GuardError>> {
    let repo_label = git_dir.display().to_string();
    let repo = Repository::open(git_dir)
        .map_err(|e| hook_error("Failed to open repository", &e.to_string(), &repo_label))?;
    let hooks_dir = resolve_hooks_dir(&repo);
    let hook_path = hooks_dir.join("pre-receive");

    if hook_path.exists() && !force {
        let existing = fs::read_to_string(&hook_path).unwrap_or_default();
        if !existing.contains(HOOK_MARKER) {
            return Err(hook_error(
                "Refusing to overwrite hook",
                &format!(
                    "{} already exists and was not installed by sizeguard; use --force to replace it",
                    hook_path.display()
                ),
                &repo_label,
            ));
        }
    }

    fs::create_dir_all(&hooks_dir).map_err(|e| {
        hook_error(
            "Failed to create hooks directory",
            &format!("{}: {}", hooks_dir.display(), e),
            &repo_label,
        )
    })?;
    fs::write(&hook_path, hook_script(exe, config)).map_err(|e| {
        hook_error(
            "Failed to write hook",
            &format!("{}: {}", hook_path.display(), e),
            &repo_label,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&hook_path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            hook_error(
                "Failed to make hook executable",
                &format!("{}: {}", hook_path.display(), e),
                &repo_label,
            )
        })?;
    }

    debug!("Installed pre-receive hook at {}", hook_path.display());
    Ok(hook_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OLD: &str = "1111111111111111111111111111111111111111";
    const NEW: &str = "2222222222222222222222222222222222222222";
    const ZERO: &str = "0000000000000000000000000000000000000000";

    #[test]
    fn test_parse_ref_updates() {
        let input = format!("{OLD} {NEW} refs/heads/main\n\n{NEW} {ZERO} refs/heads/gone\n");
        let updates = parse_ref_updates(input.as_bytes()).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].refname, "refs/heads/main");
        assert!(!updates[0].is_delete());
        assert!(updates[1].is_delete());
    }

    #[test]
    fn test_parse_ref_updates_rejects_garbage() {
        assert!(parse_ref_updates("not a ref update line\n".as_bytes()).is_err());
        assert!(parse_ref_updates(format!("{OLD} xyz refs/heads/main").as_bytes()).is_err());
    }

    #[test]
    fn test_hook_script_quotes_paths() {
        let script = hook_script(
            Path::new("/opt/it's here/sizeguard"),
            Some(Path::new("/etc/sizeguard.toml")),
        );
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains(HOOK_MARKER));
        assert!(script.contains(r"exec '/opt/it'\''s here/sizeguard' --config '/etc/sizeguard.toml' pre-receive"));
    }

    #[test]
    fn test_install_refuses_foreign_hook() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        let hooks = repo.path().join("hooks");
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("pre-receive"), "#!/bin/sh\nexit 0\n").unwrap();

        let exe = Path::new("/usr/local/bin/sizeguard");
        assert!(install_pre_receive_hook(repo.path(), exe, None, false).is_err());

        let path = install_pre_receive_hook(repo.path(), exe, None, true).unwrap();
        // Ours now, so a plain reinstall is fine
        install_pre_receive_hook(repo.path(), exe, None, false).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("sizeguard"));
    }

    #[test]
    fn test_resolve_hooks_dir_honours_config() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        assert_eq!(resolve_hooks_dir(&repo), repo.path().join("hooks"));

        repo.config()
            .unwrap()
            .set_str("core.hooksPath", "custom-hooks")
            .unwrap();
        assert_eq!(resolve_hooks_dir(&repo), repo.path().join("custom-hooks"));
    }
}
