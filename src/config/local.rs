use crate::constants::{GIT_CONFIG_LFS_SIZE_LIMIT, GIT_CONFIG_REPO_SIZE_LIMIT};
use crate::guard_error::{GuardError, GuardErrorWorkflowType, NO_CHECK};
use git2::{Config, ErrorCode, Repository};
use log::debug;
use std::path::{Path, PathBuf};

/// Per-repository limits stored in the repository's own git config, so they
/// are created, moved and deleted together with the repository.
///
/// `None` means not configured. `Some(0)` falls back to the global default,
/// `Some(-1)` is explicitly unlimited for this repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositorySizeOverride {
    pub repo_size_limit: Option<i64>,
    pub lfs_size_limit: Option<i64>,
}

fn local_error(repo: &Path, name: &str, message: &str) -> Box<GuardError> {
    Box::new(GuardError::new(
        name,
        message,
        GuardErrorWorkflowType::Config,
        &repo.display().to_string(),
        NO_CHECK,
    ))
}

/// Resolve the git directory of `repo` (a bare repository or a work tree).
pub(crate) fn open_git_dir(repo: &Path) -> Result<PathBuf, Box<GuardError>> {
    let repository = Repository::open(repo).map_err(|e| {
        Box::new(
            GuardError::new(
                "Failed to open repository",
                &format!("{} is not a git repository: {}", repo.display(), e),
                GuardErrorWorkflowType::Config,
                &repo.display().to_string(),
                NO_CHECK,
            )
            .with_status(404),
        )
    })?;
    let git_dir = repository.path().to_path_buf();
    Ok(git_dir.canonicalize().unwrap_or(git_dir))
}

impl RepositorySizeOverride {
    fn open_config(git_dir: &Path) -> Result<Config, Box<GuardError>> {
        // Only the repository file: global and system git config must not
        // leak limits into every repository.
        let config_path = git_dir.join("config");
        Config::open(&config_path).map_err(|e| {
            local_error(
                git_dir,
                "Failed to open repository config",
                &format!("Could not open {}: {}", config_path.display(), e),
            )
        })
    }

    fn read_key(config: &Config, git_dir: &Path, key: &str) -> Result<Option<i64>, Box<GuardError>> {
        match config.get_i64(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(local_error(
                git_dir,
                "Failed to read repository limit",
                &format!("Invalid value for '{key}': {e}"),
            )),
        }
    }

    /// Load the override from `git_dir/config`.
    pub fn load(git_dir: &Path) -> Result<Self, Box<GuardError>> {
        let config = Self::open_config(git_dir)?;
        let loaded = Self {
            repo_size_limit: Self::read_key(&config, git_dir, GIT_CONFIG_REPO_SIZE_LIMIT)?,
            lfs_size_limit: Self::read_key(&config, git_dir, GIT_CONFIG_LFS_SIZE_LIMIT)?,
        };
        debug!(
            "Repository override for {}: repo_size_limit={:?} lfs_size_limit={:?}",
            git_dir.display(),
            loaded.repo_size_limit,
            loaded.lfs_size_limit
        );
        Ok(loaded)
    }

    pub fn save_repo_size_limit(git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        Self::write_key(git_dir, GIT_CONFIG_REPO_SIZE_LIMIT, limit)
    }

    pub fn save_lfs_size_limit(git_dir: &Path, limit: i64) -> Result<(), Box<GuardError>> {
        Self::write_key(git_dir, GIT_CONFIG_LFS_SIZE_LIMIT, limit)
    }

    /// Remove both keys; missing keys are not an error.
    pub fn clear(git_dir: &Path) -> Result<(), Box<GuardError>> {
        let mut config = Self::open_config(git_dir)?;
        for key in [GIT_CONFIG_REPO_SIZE_LIMIT, GIT_CONFIG_LFS_SIZE_LIMIT] {
            match config.remove(key) {
                Ok(()) => debug!("Removed {} from {}", key, git_dir.display()),
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => {
                    return Err(local_error(
                        git_dir,
                        "Failed to clear repository limit",
                        &format!("Could not remove '{key}': {e}"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn write_key(git_dir: &Path, key: &str, value: i64) -> Result<(), Box<GuardError>> {
        let mut config = Self::open_config(git_dir)?;
        config.set_i64(key, value).map_err(|e| {
            local_error(
                git_dir,
                "Failed to save repository limit",
                &format!("Could not set '{key}': {e}"),
            )
        })?;
        debug!("Set {}={} in {}", key, value, git_dir.display());
        Ok(())
    }
}
